//! # Range-table interpolation
//!
//! Evaluate a [`RangeTable`] at an arbitrary distance inside its supported envelope.
//!
//! ## Variants
//! -----------------
//! * [`interpolate`] – proximity-based neighbour selection followed by 2-point linear or
//!   3-point quadratic Lagrange interpolation. This is the default fire-control path.
//! * [`interpolate_linear`] – reduced-fidelity variant: walk forward to the first row at
//!   or beyond the distance and interpolate linearly from its predecessor.
//!
//! [`InterpolationMode`] selects between them at runtime.
//!
//! ## Gating
//! -----------------
//! Both variants return `None` whenever [`RangeTable::supports_range`] is false. There is
//! no extrapolation and no clamping to the nearest row.
//!
//! ## Neighbour selection
//! -----------------
//! With `idx` the first row whose range is `>= distance`:
//! 1. the primary pair `rows[idx - 1]`, `rows[idx]` (whichever exist),
//! 2. extension candidates `rows[idx - 2]`, `rows[idx + 1]` ranked by `|range - distance|`,
//!    added while they do not repeat a range already selected, up to three points,
//! 3. the selection is sorted by range.
//!
//! The primary pair always has distinct ranges, so three selected points always have three
//! distinct abscissae.
//!
//! Each output field (`mill`, `diff100m`, `eta`) is interpolated independently; the output
//! row's `range` is the query distance.
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{RangeRow, RangeTable};
use crate::constants::Meter;

/// Interpolation variant used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Neighbour selection with quadratic Lagrange interpolation.
    #[default]
    Lagrange,
    /// Forward scan with linear interpolation.
    Linear,
}

impl InterpolationMode {
    /// Evaluate `table` at `distance` with this variant.
    pub fn interpolate(&self, table: &RangeTable, distance: Meter) -> Option<RangeRow> {
        match self {
            InterpolationMode::Lagrange => interpolate(table, distance),
            InterpolationMode::Linear => interpolate_linear(table, distance),
        }
    }
}

impl fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpolationMode::Lagrange => f.write_str("lagrange"),
            InterpolationMode::Linear => f.write_str("linear"),
        }
    }
}

impl FromStr for InterpolationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lagrange" => Ok(InterpolationMode::Lagrange),
            "linear" => Ok(InterpolationMode::Linear),
            _ => Err(format!("Invalid interpolation mode: {s}")),
        }
    }
}

/// Up to three rows around `distance`, sorted by range, no repeated range.
///
/// Arguments
/// -----------------
/// * `rows` – Table rows sorted ascending by range.
/// * `distance` – Query distance.
///
/// Return
/// ----------
/// * Between 0 and 3 rows. Empty only when `rows` is empty.
pub fn select_neighbours(rows: &[RangeRow], distance: Meter) -> Vec<RangeRow> {
    let idx = rows.partition_point(|row| row.range < distance);

    let mut selected: Vec<RangeRow> = Vec::with_capacity(3);
    if idx > 0 {
        selected.push(rows[idx - 1]);
    }
    if let Some(row) = rows.get(idx) {
        selected.push(*row);
    }

    let lower_candidate = idx.checked_sub(2).and_then(|i| rows.get(i));
    let upper_candidate = rows.get(idx + 1);

    let candidates = [lower_candidate, upper_candidate]
        .into_iter()
        .flatten()
        .sorted_by(|a, b| {
            (a.range - distance)
                .abs()
                .total_cmp(&(b.range - distance).abs())
        });

    for candidate in candidates {
        if selected.len() == 3 {
            break;
        }
        if selected.iter().all(|row| row.range != candidate.range) {
            selected.push(*candidate);
        }
    }

    selected.sort_by(|a, b| a.range.total_cmp(&b.range));
    selected
}

/// Projection of one interpolated column out of a row.
type Field = fn(&RangeRow) -> f64;

/// Interpolated columns, in `RangeRow` order after `range`.
const FIELDS: [Field; 3] = [|row| row.mill, |row| row.diff100m, |row| row.eta];

/// Linear interpolation between two rows on one field.
///
/// The ratio is 0 when both rows share the same range, so the lower row is returned.
/// Weighting both ends keeps ratios 0 and 1 exact on either knot.
fn linear(lower: &RangeRow, upper: &RangeRow, distance: Meter, field: Field) -> f64 {
    let span = upper.range - lower.range;
    let ratio = if span == 0.0 {
        0.0
    } else {
        (distance - lower.range) / span
    };
    field(lower) * (1.0 - ratio) + field(upper) * ratio
}

/// Quadratic Lagrange interpolation through three rows on one field.
///
/// A basis factor whose two abscissae coincide contributes 0.
fn lagrange(points: &[RangeRow; 3], distance: Meter, field: Field) -> f64 {
    let factor = |xi: f64, xj: f64| -> f64 {
        if xi == xj {
            0.0
        } else {
            (distance - xj) / (xi - xj)
        }
    };

    let [p0, p1, p2] = points;
    let l0 = factor(p0.range, p1.range) * factor(p0.range, p2.range);
    let l1 = factor(p1.range, p0.range) * factor(p1.range, p2.range);
    let l2 = factor(p2.range, p0.range) * factor(p2.range, p1.range);

    field(p0) * l0 + field(p1) * l1 + field(p2) * l2
}

fn build_row(distance: Meter, eval: impl Fn(Field) -> f64) -> RangeRow {
    let [mill, diff100m, eta] = FIELDS.map(eval);
    RangeRow::new(distance, mill, diff100m, eta)
}

/// Interpolate a table at `distance` using neighbour selection.
///
/// Arguments
/// -----------------
/// * `table` – Range table, rows sorted by range.
/// * `distance` – Query distance in meters.
///
/// Return
/// ----------
/// * `None` if the table does not support `distance`.
/// * The single neighbour as-is (range replaced by `distance`) if only one was selected.
/// * A linear interpolation if two neighbours were selected.
/// * A quadratic Lagrange interpolation if three were selected.
///
/// See also
/// ------------
/// * [`select_neighbours`] – the neighbour selection rule.
/// * [`interpolate_linear`] – reduced-fidelity variant.
pub fn interpolate(table: &RangeTable, distance: Meter) -> Option<RangeRow> {
    if !table.supports_range(distance) {
        return None;
    }

    let neighbours = select_neighbours(table.rows(), distance);
    let row = match neighbours.as_slice() {
        [] => return None,
        [only] => build_row(distance, |field| field(only)),
        [p0, p1, p2] if p0.range != p1.range => {
            let points = [*p0, *p1, *p2];
            build_row(distance, |field| lagrange(&points, distance, field))
        }
        [lower, upper, ..] => build_row(distance, |field| linear(lower, upper, distance, field)),
    };
    Some(row)
}

/// Interpolate a table at `distance` with a forward linear scan.
///
/// Walks the rows to the first one whose range is `>= distance` and interpolates linearly
/// from its predecessor. When that row is the first one, it is returned as-is.
///
/// Return
/// ----------
/// * `None` if the table does not support `distance`, else the interpolated row.
pub fn interpolate_linear(table: &RangeTable, distance: Meter) -> Option<RangeRow> {
    if !table.supports_range(distance) {
        return None;
    }

    let rows = table.rows();
    let (pos, upper) = rows.iter().find_position(|row| row.range >= distance)?;
    let row = match pos.checked_sub(1).and_then(|i| rows.get(i)) {
        Some(lower) => build_row(distance, |field| linear(lower, upper, distance, field)),
        None => build_row(distance, |field| field(upper)),
    };
    Some(row)
}

#[cfg(test)]
mod interpolation_tests {
    use super::*;
    use crate::range_table::{TableId, Trajectory};
    use approx::assert_relative_eq;

    fn table(rows: &[(f64, f64, f64, f64)]) -> RangeTable {
        RangeTable::new(
            TableId::new("M109A6", Trajectory::Low, 1),
            rows.iter()
                .map(|&(r, m, d, e)| RangeRow::new(r, m, d, e))
                .collect(),
        )
    }

    fn three_rows() -> RangeTable {
        table(&[
            (1000.0, 10.0, 1.0, 5.0),
            (2000.0, 20.0, 2.0, 10.0),
            (3000.0, 35.0, 1.5, 14.0),
        ])
    }

    #[test]
    fn test_select_neighbours_interior() {
        let t = three_rows();
        let ranges: Vec<f64> = select_neighbours(t.rows(), 1500.0)
            .iter()
            .map(|r| r.range)
            .collect();
        assert_eq!(ranges, vec![1000.0, 2000.0, 3000.0]);
    }

    #[test]
    fn test_select_neighbours_prefers_closest_extension() {
        let t = table(&[
            (1000.0, 1.0, 0.0, 0.0),
            (2000.0, 2.0, 0.0, 0.0),
            (3000.0, 3.0, 0.0, 0.0),
            (3100.0, 4.0, 0.0, 0.0),
            (5000.0, 5.0, 0.0, 0.0),
        ]);
        // primary pair 2000/3000, candidates 1000 (|d| 1500) and 3100 (|d| 600)
        let ranges: Vec<f64> = select_neighbours(t.rows(), 2500.0)
            .iter()
            .map(|r| r.range)
            .collect();
        assert_eq!(ranges, vec![2000.0, 3000.0, 3100.0]);
    }

    #[test]
    fn test_select_neighbours_skips_repeated_range() {
        let t = table(&[
            (1000.0, 10.0, 1.0, 5.0),
            (2000.0, 20.0, 2.0, 10.0),
            (2000.0, 21.0, 2.0, 10.0),
        ]);
        let selected = select_neighbours(t.rows(), 1500.0);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1].mill, 20.0);
    }

    #[test]
    fn test_lagrange_value() {
        let row = interpolate(&three_rows(), 1500.0).unwrap();
        assert_eq!(row.range, 1500.0);
        assert_relative_eq!(row.mill, 14.375, epsilon = 1e-12);
        assert_relative_eq!(row.diff100m, 1.6875, epsilon = 1e-12);
        assert_relative_eq!(row.eta, 7.625, epsilon = 1e-12);
    }

    #[test]
    fn test_two_point_linear() {
        let t = table(&[(1000.0, 10.0, 1.0, 5.0), (2000.0, 20.0, 2.0, 10.0)]);
        for variant in [interpolate, interpolate_linear] {
            let row = variant(&t, 1500.0).unwrap();
            assert_relative_eq!(row.mill, 15.0, epsilon = 1e-12);
            assert_relative_eq!(row.diff100m, 1.5, epsilon = 1e-12);
            assert_relative_eq!(row.eta, 7.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_scan_on_three_rows() {
        let row = interpolate_linear(&three_rows(), 1500.0).unwrap();
        assert_relative_eq!(row.mill, 15.0, epsilon = 1e-12);
        assert_relative_eq!(row.eta, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_knots_are_reproduced() {
        let t = three_rows();
        for knot in t.rows() {
            for mode in [InterpolationMode::Lagrange, InterpolationMode::Linear] {
                let row = mode.interpolate(&t, knot.range).unwrap();
                assert_eq!(row, *knot, "{mode} at {}", knot.range);
            }
        }
    }

    /// Non-integer samples, the kind real tables carry.
    fn fractional_table(count: usize) -> RangeTable {
        let rows = (0..count)
            .map(|i| {
                let x = i as f64;
                (
                    1000.0 + 38.0 * x + 0.125 * x * x,
                    (0.731 * x).sin() * 100.0 + 0.2,
                    0.741 + 0.013 * x,
                    3.3 + (0.17 * x).cos() / 7.0,
                )
            })
            .collect::<Vec<_>>();
        table(&rows)
    }

    #[test]
    fn test_knots_are_reproduced_on_fractional_data() {
        let tables = [
            table(&[(1000.0, 0.2, 0.1, 4.3), (2000.0, 0.741, 0.37, 9.1)]),
            table(&[(1000.1, 1.1, 0.3, 2.2), (1000.3, 3.3, 0.7, 4.4)]),
            fractional_table(50),
        ];
        for t in &tables {
            for knot in t.rows() {
                for mode in [InterpolationMode::Lagrange, InterpolationMode::Linear] {
                    let row = mode.interpolate(t, knot.range).unwrap();
                    assert_eq!(row, *knot, "{mode} at {}", knot.range);
                }
            }
        }
    }

    #[test]
    fn test_linear_ends_are_exact() {
        let lower = RangeRow::new(1000.0, 0.2, 0.1, 4.3);
        let upper = RangeRow::new(2000.0, 0.741, 0.37, 9.1);
        for field in FIELDS {
            assert_eq!(linear(&lower, &upper, 1000.0, field), field(&lower));
            assert_eq!(linear(&lower, &upper, 2000.0, field), field(&upper));
        }
    }

    #[test]
    fn test_out_of_range_is_none() {
        let t = three_rows();
        for d in [999.0, 3000.5, f64::NAN] {
            assert!(interpolate(&t, d).is_none());
            assert!(interpolate_linear(&t, d).is_none());
        }
        let empty = RangeTable::empty(TableId::new("M119", Trajectory::High, 2));
        assert!(interpolate(&empty, 0.0).is_none());
        assert!(interpolate_linear(&empty, 0.0).is_none());
    }

    #[test]
    fn test_single_row_passthrough() {
        let t = table(&[(1200.0, 12.0, 1.2, 6.0)]);
        assert_eq!(
            interpolate(&t, 1200.0),
            Some(RangeRow::new(1200.0, 12.0, 1.2, 6.0))
        );
        assert_eq!(interpolate_linear(&t, 1200.0), interpolate(&t, 1200.0));
    }

    #[test]
    fn test_zero_span_is_lower_row() {
        let lower = RangeRow::new(1000.0, 10.0, 1.0, 5.0);
        let upper = RangeRow::new(1000.0, 99.0, 9.0, 50.0);
        assert_eq!(linear(&lower, &upper, 1000.0, |r| r.mill), 10.0);
    }

    #[test]
    fn test_linear_is_monotonic_between_rows() {
        let t = table(&[(1000.0, 10.0, 1.0, 5.0), (2000.0, 20.0, 2.0, 10.0)]);
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=20 {
            let d = 1000.0 + 50.0 * step as f64;
            let mill = interpolate_linear(&t, d).unwrap().mill;
            assert!(mill >= previous);
            assert!((10.0..=20.0).contains(&mill));
            previous = mill;
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "linear".parse::<InterpolationMode>(),
            Ok(InterpolationMode::Linear)
        );
        assert_eq!(
            "Lagrange".parse::<InterpolationMode>(),
            Ok(InterpolationMode::Lagrange)
        );
        assert!("cubic".parse::<InterpolationMode>().is_err());
        assert_eq!(InterpolationMode::default(), InterpolationMode::Lagrange);
    }
}
