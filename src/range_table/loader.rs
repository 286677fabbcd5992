//! # CSV range-table loader
//!
//! Turns the text of a range-table file into a sorted [`RangeTable`].
//!
//! ## File format
//! -----------------
//! * UTF-8 text, first non-blank line is a **header**.
//! * Following lines hold one sample each: `range,mill,diff100m,eta` as decimal numbers
//!   with a `.` decimal point. Whitespace around fields is ignored.
//! * Rows may appear in any order on disk; the loader sorts them by range.
//!
//! ## Column layout
//! -----------------
//! If the header names all four columns `range`, `mill`, `diff100m` and `eta`
//! (case-insensitive), the values are looked up by name, so extra or reordered columns are
//! fine. Otherwise the header is ignored and the first four columns are read positionally
//! in that order.
//!
//! ## Row policy
//! -----------------
//! A row is accepted only if the four values exist and parse as finite numbers. Every
//! other row (short, non-numeric, undecodable) is skipped silently; a malformed row is
//! never fatal.
//!
//! ## Errors
//! -----------------
//! See [`LoadError`]. The caller decides what an unusable table means; the
//! [`solver`](crate::solver) skips it and records a warning.
use std::fs::File;
use std::io::{self, BufReader, Read};

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, trace};

use super::{RangeRow, RangeTable, TableId};

/// Failures while loading a single range table.
///
/// Variants
/// -----------------
/// * `Io` – The file is missing or cannot be read.
/// * `MissingHeader` – The input has no header line at all.
/// * `NoValidRows` – A header was found but no row passed the row policy.
/// * `TooManyRows` – More valid rows than the configured capacity.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read range table {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: io::Error,
    },

    #[error("Range table {0} has no header line")]
    MissingHeader(String),

    #[error("Range table {0} contains no valid rows")]
    NoValidRows(String),

    #[error("Range table {origin} exceeds the capacity of {limit} rows")]
    TooManyRows { origin: String, limit: usize },
}

impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        use LoadError::*;
        match (self, other) {
            // io::Error is not comparable: same origin and same kind is enough
            (
                Io {
                    origin: a,
                    source: sa,
                },
                Io {
                    origin: b,
                    source: sb,
                },
            ) => a == b && sa.kind() == sb.kind(),
            (MissingHeader(a), MissingHeader(b)) => a == b,
            (NoValidRows(a), NoValidRows(b)) => a == b,
            (
                TooManyRows {
                    origin: a,
                    limit: la,
                },
                TooManyRows {
                    origin: b,
                    limit: lb,
                },
            ) => a == b && la == lb,
            _ => false,
        }
    }
}

/// Column indices of `range`, `mill`, `diff100m`, `eta` in a record.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnLayout {
    indices: [usize; 4],
    by_name: bool,
}

impl ColumnLayout {
    const NAMES: [&'static str; 4] = ["range", "mill", "diff100m", "eta"];

    fn positional() -> Self {
        ColumnLayout {
            indices: [0, 1, 2, 3],
            by_name: false,
        }
    }

    /// Resolve the layout from the header fields.
    fn from_header(header: &csv::ByteRecord) -> Self {
        let names: Vec<String> = header
            .iter()
            .map(|field| {
                String::from_utf8_lossy(field)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_ascii_lowercase()
            })
            .collect();

        let mut indices = [0usize; 4];
        for (slot, wanted) in indices.iter_mut().zip(Self::NAMES) {
            match names.iter().position(|name| name == wanted) {
                Some(idx) => *slot = idx,
                None => return Self::positional(),
            }
        }

        ColumnLayout {
            indices,
            by_name: true,
        }
    }

    /// Extract a row, `None` if any value is absent or not a finite number.
    fn parse_row(&self, record: &csv::ByteRecord) -> Option<RangeRow> {
        let value = |idx: usize| -> Option<f64> {
            let raw = std::str::from_utf8(record.get(idx)?).ok()?;
            raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        };

        let [range, mill, diff100m, eta] = self.indices;
        Some(RangeRow::new(
            value(range)?,
            value(mill)?,
            value(diff100m)?,
            value(eta)?,
        ))
    }
}

/// Parse range-table CSV text from any reader.
///
/// Arguments
/// -----------------
/// * `id` – Identity given to the resulting table.
/// * `reader` – CSV text source.
/// * `origin` – Human-readable origin (path or entry name) used in errors and logs.
/// * `max_rows` – Capacity ceiling on accepted rows.
///
/// Return
/// ----------
/// * A [`RangeTable`] sorted by range, or a [`LoadError`].
///
/// See also
/// ------------
/// * [`load_table`] – Same, reading from a file path.
pub fn load_from_reader<R: Read>(
    id: TableId,
    reader: R,
    origin: &str,
    max_rows: usize,
) -> Result<RangeTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header = match csv_reader.byte_headers() {
        Ok(header) if !header.is_empty() => header.clone(),
        Ok(_) => return Err(LoadError::MissingHeader(origin.to_string())),
        Err(err) => {
            return Err(match err.into_kind() {
                csv::ErrorKind::Io(source) => LoadError::Io {
                    origin: origin.to_string(),
                    source,
                },
                _ => LoadError::MissingHeader(origin.to_string()),
            })
        }
    };

    let layout = ColumnLayout::from_header(&header);
    debug!(
        table = %id,
        by_name = layout.by_name,
        "reading range table {origin}"
    );

    let mut rows = Vec::new();
    for (line_idx, record) in csv_reader.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                if let csv::ErrorKind::Io(source) = err.into_kind() {
                    return Err(LoadError::Io {
                        origin: origin.to_string(),
                        source,
                    });
                }
                trace!("{origin}: skipping undecodable record #{}", line_idx + 1);
                continue;
            }
        };

        let Some(row) = layout.parse_row(&record) else {
            trace!("{origin}: skipping malformed record #{}", line_idx + 1);
            continue;
        };

        if rows.len() == max_rows {
            return Err(LoadError::TooManyRows {
                origin: origin.to_string(),
                limit: max_rows,
            });
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LoadError::NoValidRows(origin.to_string()));
    }

    Ok(RangeTable::new(id, rows))
}

/// Load a range table from a CSV file.
///
/// Arguments
/// -----------------
/// * `id` – Identity given to the resulting table.
/// * `path` – Path of the CSV file.
/// * `max_rows` – Capacity ceiling on accepted rows.
///
/// Return
/// ----------
/// * A sorted [`RangeTable`], or [`LoadError::Io`] if the file cannot be opened, or any
///   parsing failure from [`load_from_reader`].
pub fn load_table(id: TableId, path: &Utf8Path, max_rows: usize) -> Result<RangeTable, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        origin: path.to_string(),
        source,
    })?;
    load_from_reader(id, BufReader::new(file), path.as_str(), max_rows)
}

impl RangeTable {
    /// Load a table, degrading any failure to an [`empty`](RangeTable::empty) table.
    ///
    /// Callers that only need "usable or not" can test [`RangeTable::is_empty`] instead of
    /// handling [`LoadError`].
    pub fn load_or_empty(id: TableId, path: &Utf8Path, max_rows: usize) -> RangeTable {
        match load_table(id.clone(), path, max_rows) {
            Ok(table) => table,
            Err(err) => {
                debug!("range table {id} unusable: {err}");
                RangeTable::empty(id)
            }
        }
    }
}
