//! # Range tables: samples, identity and supported envelope
//!
//! A **range table** is the ballistic data of one (weapon system, trajectory, charge)
//! combination: an ordered list of [`RangeRow`] samples giving, for a tabulated distance,
//! the elevation in mils, the mil correction per 100 m of altitude difference and the
//! time of flight.
//!
//! ## Overview
//! -----------------
//! * [`RangeRow`] – one immutable sample `(range, mill, diff100m, eta)`.
//! * [`Trajectory`] – low (flat) or high (lobbed) angle of fire.
//! * [`TableId`] – identity of a table and its canonical filename.
//! * [`RangeTable`] – a [`TableId`] plus its rows, **sorted ascending by range**.
//! * [`RangeEnvelope`] – `[min, max]` distance span supported by one or more tables.
//!
//! Submodules
//! -----------------
//! * [`loader`](crate::range_table::loader) – CSV parsing into a [`RangeTable`].
//! * [`interpolation`](crate::range_table::interpolation) – neighbour selection, linear and
//!   quadratic (Lagrange) interpolation.
//!
//! ## Invariants
//! -----------------
//! * Rows are sorted by `range` once a table is built; duplicates are allowed.
//! * `min_range = rows[0].range` and `max_range = rows[last].range`.
//! * An empty table is a valid, inert value meaning "not loaded / unusable": it supports
//!   no distance and yields no interpolation.
//!
//! ## See also
//! ------------
//! * [`crate::catalog`] – discovers tables on disk from their filenames.
//! * [`crate::solver`] – selects tables and turns interpolated rows into firing solutions.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{Charge, Meter, Mil, Second, RANGE_TABLE_EXTENSION, RANGE_TABLE_MARKER};

pub mod interpolation;
pub mod loader;

/// One tabulated sample of a range table.
///
/// Fields
/// -----------------
/// * `range` – Distance to target in meters (lookup key).
/// * `mill` – Elevation in mils at this distance.
/// * `diff100m` – Mil correction per 100 m of altitude delta.
/// * `eta` – Time of flight in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeRow {
    pub range: Meter,
    pub mill: Mil,
    pub diff100m: Mil,
    pub eta: Second,
}

impl RangeRow {
    pub fn new(range: Meter, mill: Mil, diff100m: Mil, eta: Second) -> Self {
        RangeRow {
            range,
            mill,
            diff100m,
            eta,
        }
    }
}

/// Angle of fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Low,
    High,
}

impl Trajectory {
    /// Both trajectories, in the order solutions are reported.
    pub const ALL: [Trajectory; 2] = [Trajectory::Low, Trajectory::High];

    /// Token used in filenames and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Low => "low",
            Trajectory::High => "high",
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trajectory {
    type Err = String;

    /// Parse `"low"` / `"high"` (exact, lowercase as in filenames).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Trajectory::Low),
            "high" => Ok(Trajectory::High),
            _ => Err(format!("Invalid trajectory: {s} (expected \"low\" or \"high\")")),
        }
    }
}

/// Identity of a range table: `(system, trajectory, charge)`.
///
/// `system` is the **file prefix** as it appears in the filename (e.g. `RM70`), not
/// necessarily the display name an operator types (`RM-70`); see
/// [`crate::config::SystemProfile::file_prefix`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId {
    pub system: String,
    pub trajectory: Trajectory,
    pub charge: Charge,
}

impl TableId {
    pub fn new(system: impl Into<String>, trajectory: Trajectory, charge: Charge) -> Self {
        TableId {
            system: system.into(),
            trajectory,
            charge,
        }
    }

    /// Canonical filename `<system>_rangeTable_<trajectory>_<charge>.csv`.
    ///
    /// The charge is written without leading zeros.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.system, RANGE_TABLE_MARKER, self.trajectory, self.charge, RANGE_TABLE_EXTENSION
        )
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / charge {}",
            self.system, self.trajectory, self.charge
        )
    }
}

/// Closed distance interval `[min, max]` supported by one or several tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEnvelope {
    pub min: Meter,
    pub max: Meter,
}

impl RangeEnvelope {
    pub fn new(min: Meter, max: Meter) -> Self {
        RangeEnvelope { min, max }
    }

    pub fn contains(&self, distance: Meter) -> bool {
        self.min <= distance && distance <= self.max
    }

    /// Smallest envelope covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &RangeEnvelope) -> RangeEnvelope {
        RangeEnvelope {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Fold an optional accumulated envelope with a new one.
    pub fn merge(acc: Option<RangeEnvelope>, other: RangeEnvelope) -> Option<RangeEnvelope> {
        Some(match acc {
            Some(env) => env.union(&other),
            None => other,
        })
    }
}

impl fmt::Display for RangeEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m ~ {:.2} m", self.min, self.max)
    }
}

/// Ballistic data for one [`TableId`], rows sorted ascending by range.
///
/// Construction always sorts, so every method can rely on the ordering. The rows are not
/// deduplicated: repeated ranges collapse during interpolation instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    id: TableId,
    rows: Vec<RangeRow>,
}

impl RangeTable {
    /// Build a table from rows in any order.
    ///
    /// Arguments
    /// -----------------
    /// * `id` – Identity of the table.
    /// * `rows` – Samples in arbitrary order; sorted here by `range` (stable sort, so rows
    ///   sharing a range keep their file order).
    ///
    /// Return
    /// ----------
    /// * A sorted [`RangeTable`].
    pub fn new(id: TableId, mut rows: Vec<RangeRow>) -> Self {
        rows.sort_by(|a, b| a.range.total_cmp(&b.range));
        RangeTable { id, rows }
    }

    /// An unusable table: no rows, supports no distance.
    pub fn empty(id: TableId) -> Self {
        RangeTable {
            id,
            rows: Vec::new(),
        }
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub fn charge(&self) -> Charge {
        self.id.charge
    }

    pub fn rows(&self) -> &[RangeRow] {
        &self.rows
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn min_range(&self) -> Option<Meter> {
        self.rows.first().map(|r| r.range)
    }

    pub fn max_range(&self) -> Option<Meter> {
        self.rows.last().map(|r| r.range)
    }

    /// Supported distance span, `None` for an empty table.
    pub fn envelope(&self) -> Option<RangeEnvelope> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some(RangeEnvelope::new(first.range, last.range)),
            _ => None,
        }
    }

    /// `true` iff the table is non-empty and `min_range <= distance <= max_range`.
    ///
    /// Distances outside this interval must never be extrapolated; both interpolation
    /// variants return `None` for them.
    pub fn supports_range(&self, distance: Meter) -> bool {
        self.envelope()
            .is_some_and(|envelope| envelope.contains(distance))
    }
}

#[cfg(test)]
mod range_table_tests {
    use super::*;

    fn sample_id() -> TableId {
        TableId::new("M109A6", Trajectory::Low, 3)
    }

    #[test]
    fn test_rows_are_sorted_on_construction() {
        let table = RangeTable::new(
            sample_id(),
            vec![
                RangeRow::new(3000.0, 35.0, 1.5, 14.0),
                RangeRow::new(1000.0, 10.0, 1.0, 5.0),
                RangeRow::new(2000.0, 20.0, 2.0, 10.0),
            ],
        );
        let ranges: Vec<f64> = table.rows().iter().map(|r| r.range).collect();
        assert_eq!(ranges, vec![1000.0, 2000.0, 3000.0]);
        assert_eq!(table.min_range(), Some(1000.0));
        assert_eq!(table.max_range(), Some(3000.0));
    }

    #[test]
    fn test_supports_range_bounds_are_inclusive() {
        let table = RangeTable::new(
            sample_id(),
            vec![
                RangeRow::new(1000.0, 10.0, 1.0, 5.0),
                RangeRow::new(2000.0, 20.0, 2.0, 10.0),
            ],
        );
        assert!(table.supports_range(1000.0));
        assert!(table.supports_range(2000.0));
        assert!(table.supports_range(1500.0));
        assert!(!table.supports_range(999.9));
        assert!(!table.supports_range(2000.1));
        assert!(!table.supports_range(f64::NAN));
    }

    #[test]
    fn test_empty_table_is_inert() {
        let table = RangeTable::empty(sample_id());
        assert_eq!(table.count(), 0);
        assert!(table.envelope().is_none());
        assert!(!table.supports_range(0.0));
    }

    #[test]
    fn test_table_id_file_name() {
        assert_eq!(sample_id().file_name(), "M109A6_rangeTable_low_3.csv");
        assert_eq!(
            TableId::new("M1129", Trajectory::High, 0).file_name(),
            "M1129_rangeTable_high_0.csv"
        );
    }

    #[test]
    fn test_trajectory_parsing() {
        assert_eq!("low".parse::<Trajectory>(), Ok(Trajectory::Low));
        assert_eq!("high".parse::<Trajectory>(), Ok(Trajectory::High));
        assert!("HIGH".parse::<Trajectory>().is_err());
        assert!("mid".parse::<Trajectory>().is_err());
    }

    #[test]
    fn test_envelope_union() {
        let merged = RangeEnvelope::merge(None, RangeEnvelope::new(1000.0, 3000.0));
        let merged = RangeEnvelope::merge(merged, RangeEnvelope::new(500.0, 2000.0));
        assert_eq!(merged, Some(RangeEnvelope::new(500.0, 3000.0)));
    }
}
