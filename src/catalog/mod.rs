//! # Range-table catalog
//!
//! Discovers which range tables exist by looking at **entry names only**, then loads the
//! ones a query needs.
//!
//! ## Filename convention
//! -----------------
//! `<system>_rangeTable_<trajectory>_<charge>.csv`, e.g. `M109A6_rangeTable_low_3.csv`:
//! * `system` – file prefix of the weapon system, contains no `_`,
//! * `trajectory` – `low` or `high`,
//! * `charge` – decimal digits.
//!
//! Entries that do not follow this convention are ignored.
//!
//! ## Discovery
//! -----------------
//! [`Catalog::discover`] filters on system and trajectory (exact matches; charges are
//! never filtered here), orders results by `(system, trajectory, charge)`, deduplicates by
//! [`TableId`] and truncates to the configured table cap.
//!
//! Nothing is cached: every call rescans the source.
//!
//! ## See also
//! ------------
//! * [`source`] – the [`TableSource`] capability and its directory / in-memory
//!   implementations.
//! * [`crate::range_table::loader`] – what [`Catalog::load`] runs on an entry.
use std::collections::BTreeMap;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{Charge, MAX_TABLES};
use crate::range_table::loader::{load_from_reader, LoadError};
use crate::range_table::{RangeTable, TableId, Trajectory};

pub mod source;

pub use source::{DirectorySource, MemorySource, TableSource};

static TABLE_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<system>[^_]+)_rangeTable_(?P<trajectory>low|high)_(?P<charge>\d+)\.csv$")
        .unwrap()
});

/// Failures while enumerating tables.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Range table directory not found: {0} (create it and add <system>_rangeTable_<low|high>_<charge>.csv files)")]
    NoDirectory(Utf8PathBuf),

    #[error("No range tables found in {location}{}", describe_filters(.system, .trajectory))]
    NoTables {
        location: String,
        system: Option<String>,
        trajectory: Option<Trajectory>,
    },

    #[error("Unable to list range tables in {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
}

fn describe_filters(system: &Option<String>, trajectory: &Option<Trajectory>) -> String {
    match (system, trajectory) {
        (None, None) => String::new(),
        (Some(s), None) => format!(" for system {s}"),
        (None, Some(t)) => format!(" for {t} trajectory"),
        (Some(s), Some(t)) => format!(" for system {s}, {t} trajectory"),
    }
}

impl PartialEq for CatalogError {
    fn eq(&self, other: &Self) -> bool {
        use CatalogError::*;
        match (self, other) {
            (NoDirectory(a), NoDirectory(b)) => a == b,
            (
                NoTables {
                    location: la,
                    system: sa,
                    trajectory: ta,
                },
                NoTables {
                    location: lb,
                    system: sb,
                    trajectory: tb,
                },
            ) => la == lb && sa == sb && ta == tb,
            (Io { location: a, .. }, Io { location: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A discovered table: its identity and the source entry holding it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableInfo {
    pub id: TableId,
    pub entry: String,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.entry)
    }
}

/// Parse an entry name following the range-table filename convention.
///
/// Return
/// ----------
/// * The [`TableId`] encoded in the name, or `None` if the name does not match or the
///   charge does not fit a charge number.
pub fn parse_table_file_name(name: &str) -> Option<TableId> {
    let caps = TABLE_FILE_NAME.captures(name)?;
    let trajectory = caps["trajectory"].parse::<Trajectory>().ok()?;
    let charge = caps["charge"].parse().ok()?;
    Some(TableId::new(&caps["system"], trajectory, charge))
}

/// Table discovery and loading over a [`TableSource`].
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    source: S,
    max_tables: usize,
}

impl Catalog<DirectorySource> {
    /// Catalog over a directory on disk, with the default table cap.
    pub fn from_dir(root: impl AsRef<Utf8Path>) -> Self {
        Catalog::new(DirectorySource::new(root.as_ref()), MAX_TABLES)
    }
}

impl<S: TableSource> Catalog<S> {
    pub fn new(source: S, max_tables: usize) -> Self {
        Catalog { source, max_tables }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn max_tables(&self) -> usize {
        self.max_tables
    }

    /// Enumerate the tables available in the source.
    ///
    /// Arguments
    /// -----------------
    /// * `system` – Keep only this file prefix (exact match), or every system if `None`.
    /// * `trajectory` – Keep only this trajectory, or both if `None`.
    ///
    /// Return
    /// ----------
    /// * The matching tables, sorted by `(system, trajectory, charge)`, without duplicate
    ///   identities, at most `max_tables` of them.
    ///
    /// Errors
    /// ----------
    /// * [`CatalogError::NoDirectory`] / [`CatalogError::Io`] from the source.
    /// * [`CatalogError::NoTables`] if nothing matches.
    pub fn discover(
        &self,
        system: Option<&str>,
        trajectory: Option<Trajectory>,
    ) -> Result<Vec<TableInfo>, CatalogError> {
        let mut entries = self.source.list_entries()?;
        entries.sort();

        let mut found: BTreeMap<TableId, String> = BTreeMap::new();
        for entry in entries {
            let Some(id) = parse_table_file_name(&entry) else {
                continue;
            };
            if system.is_some_and(|s| s != id.system) {
                continue;
            }
            if trajectory.is_some_and(|t| t != id.trajectory) {
                continue;
            }
            found.entry(id).or_insert(entry);
        }

        if found.is_empty() {
            return Err(CatalogError::NoTables {
                location: self.source.describe(),
                system: system.map(str::to_string),
                trajectory,
            });
        }

        let total = found.len();
        let tables: Vec<TableInfo> = found
            .into_iter()
            .take(self.max_tables)
            .map(|(id, entry)| TableInfo { id, entry })
            .collect();

        if total > self.max_tables {
            warn!(
                "{total} range tables found in {}, keeping the first {}",
                self.source.describe(),
                self.max_tables
            );
        }
        debug!(
            "discovered {} range tables in {}",
            tables.len(),
            self.source.describe()
        );

        Ok(tables)
    }

    /// Charges available for one system and trajectory, ascending.
    pub fn charges(
        &self,
        system: &str,
        trajectory: Trajectory,
    ) -> Result<Vec<Charge>, CatalogError> {
        Ok(self
            .discover(Some(system), Some(trajectory))?
            .into_iter()
            .map(|info| info.id.charge)
            .collect())
    }

    /// Load a discovered table through the source.
    ///
    /// Arguments
    /// -----------------
    /// * `info` – Entry returned by [`Catalog::discover`].
    /// * `max_rows` – Row capacity handed to the loader.
    pub fn load(&self, info: &TableInfo, max_rows: usize) -> Result<RangeTable, LoadError> {
        let origin = format!("{}/{}", self.source.describe(), info.entry);
        let reader = self
            .source
            .open_entry(&info.entry)
            .map_err(|source| LoadError::Io {
                origin: origin.clone(),
                source,
            })?;
        load_from_reader(info.id.clone(), reader, &origin, max_rows)
    }

    /// Load a table by identity, using its canonical filename.
    pub fn load_id(&self, id: &TableId, max_rows: usize) -> Result<RangeTable, LoadError> {
        let info = TableInfo {
            id: id.clone(),
            entry: id.file_name(),
        };
        self.load(&info, max_rows)
    }
}
