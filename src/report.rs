//! # Plain-text rendering of firing solutions and catalog listings
//!
//! Borrowing display adaptors, printed with `{}`:
//!
//! * [`SolutionsDisplay`] – query header, then per trajectory either a compact
//!   `CH | MILL | ETA` table or, in detailed mode, one block per solution spelling out the
//!   altitude correction. Warnings come last.
//! * [`CatalogDisplay`] – one line per `(system, trajectory)` with its charges.
//!
//! ```rust,ignore
//! println!("{}", solutions.show());
//! println!("{}", solutions.show().trajectories(&[Trajectory::Low]).detailed(true));
//! ```
use std::fmt;

use itertools::Itertools;

use crate::catalog::TableInfo;
use crate::range_table::Trajectory;
use crate::solver::{FireSolutions, RangeSolution};

/// Layout selector of [`SolutionsDisplay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportMode {
    /// One `CH | MILL | ETA` table per trajectory.
    Compact,
    /// One block per solution with base mill and correction.
    Detailed,
}

/// Display adaptor over a [`FireSolutions`].
///
/// Trajectories are printed in the order given to [`SolutionsDisplay::trajectories`]
/// (both, low first, by default). An empty trajectory prints `<TITLE>: out of range`.
pub struct SolutionsDisplay<'a> {
    solutions: &'a FireSolutions,
    trajectories: &'a [Trajectory],
    mode: ReportMode,
}

impl<'a> SolutionsDisplay<'a> {
    pub fn new(solutions: &'a FireSolutions) -> Self {
        SolutionsDisplay {
            solutions,
            trajectories: &Trajectory::ALL,
            mode: ReportMode::Compact,
        }
    }

    /// Only print these trajectories.
    pub fn trajectories(mut self, trajectories: &'a [Trajectory]) -> Self {
        self.trajectories = trajectories;
        self
    }

    /// Switch between the detailed and the compact layout.
    pub fn detailed(mut self, yes: bool) -> Self {
        self.mode = if yes {
            ReportMode::Detailed
        } else {
            ReportMode::Compact
        };
        self
    }

    fn write_header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "System: {}\nDistance: {:.1} m\nAltitude delta: {:+.1} m",
            self.solutions.system, self.solutions.distance, self.solutions.altitude_delta
        )
    }

    fn write_detail_block(
        &self,
        f: &mut fmt::Formatter<'_>,
        trajectory: Trajectory,
        s: &RangeSolution,
    ) -> fmt::Result {
        write!(
            f,
            "[{}] charge {}\n  base mill  : {:>10.2}\n  diff/100 m : {:>10.2}\n  correction : {:>+10.2} (altitude delta {:+.1} m)\n  mill       : {:>10.2}\n  eta        : {:>10.1} s",
            title(trajectory),
            s.charge,
            s.base_mill,
            s.diff100m,
            s.mill - s.base_mill,
            self.solutions.altitude_delta,
            s.mill,
            s.eta
        )
    }
}

fn title(trajectory: Trajectory) -> String {
    trajectory.as_str().to_uppercase()
}

/// One trajectory as a `CH | MILL | ETA` table, or `<title>: out of range` when empty.
fn write_solution_list(
    out: &mut impl fmt::Write,
    title: &str,
    solutions: &[RangeSolution],
) -> fmt::Result {
    if solutions.is_empty() {
        return write!(out, "{title}: out of range");
    }

    write!(out, "{title}:\n{:>2} | {:>10} | {:>5}", "CH", "MILL", "ETA")?;
    for s in solutions {
        write!(out, "\n{:>2} | {:>10.2} | {:>5.1}", s.charge, s.mill, s.eta)?;
    }
    Ok(())
}

impl fmt::Display for SolutionsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(f)?;

        for &trajectory in self.trajectories {
            let list = self.solutions.for_trajectory(trajectory);
            match self.mode {
                ReportMode::Compact => {
                    f.write_str("\n\n")?;
                    write_solution_list(f, &title(trajectory), list)?;
                }
                ReportMode::Detailed if list.is_empty() => {
                    write!(f, "\n\n{}: out of range", title(trajectory))?;
                }
                ReportMode::Detailed => {
                    for s in list {
                        f.write_str("\n\n")?;
                        self.write_detail_block(f, trajectory, s)?;
                    }
                }
            }
        }

        if !self.solutions.warnings.is_empty() {
            f.write_str("\n")?;
            for warning in &self.solutions.warnings {
                write!(f, "\nwarning: {warning}")?;
            }
        }
        Ok(())
    }
}

impl FireSolutions {
    /// Compact report of every trajectory; see [`SolutionsDisplay`] for the options.
    pub fn show(&self) -> SolutionsDisplay<'_> {
        SolutionsDisplay::new(self)
    }
}

/// Catalog listing, one line per (system, trajectory): `M109A6 low: charges 1, 3`.
pub struct CatalogDisplay<'a> {
    tables: &'a [TableInfo],
}

impl<'a> CatalogDisplay<'a> {
    pub fn new(tables: &'a [TableInfo]) -> Self {
        CatalogDisplay { tables }
    }
}

impl fmt::Display for CatalogDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.is_empty() {
            return f.write_str("No range tables found");
        }

        let groups = self
            .tables
            .iter()
            .chunk_by(|info| (info.id.system.as_str(), info.id.trajectory));
        for (line, ((system, trajectory), group)) in groups.into_iter().enumerate() {
            if line > 0 {
                f.write_str("\n")?;
            }
            write!(
                f,
                "{system} {trajectory}: charges {}",
                group.map(|info| info.id.charge).join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;
    use crate::range_table::TableId;

    fn solution(charge: u32, mill: f64, eta: f64) -> RangeSolution {
        RangeSolution {
            charge,
            mill,
            base_mill: mill - 3.0,
            diff100m: 1.5,
            eta,
        }
    }

    fn solutions() -> FireSolutions {
        FireSolutions {
            system: "M109A6".into(),
            distance: 1500.0,
            altitude_delta: 200.0,
            low: vec![solution(1, 18.0, 7.5), solution(12, 1234.567, 40.31)],
            high: Vec::new(),
            envelope: None,
            warnings: vec!["No high trajectory solution".into()],
        }
    }

    #[test]
    fn test_solution_list_layout() {
        let mut text = String::new();
        write_solution_list(&mut text, "LOW", &solutions().low).unwrap();
        assert_eq!(
            text,
            "LOW:\nCH |       MILL |   ETA\n 1 |      18.00 |   7.5\n12 |    1234.57 |  40.3"
        );

        let mut text = String::new();
        write_solution_list(&mut text, "HIGH", &[]).unwrap();
        assert_eq!(text, "HIGH: out of range");
    }

    #[test]
    fn test_full_report_sections() {
        let solutions = solutions();
        let text = solutions.show().to_string();
        assert!(text.starts_with("System: M109A6\nDistance: 1500.0 m\nAltitude delta: +200.0 m"));
        assert!(text.contains("\n\nLOW:\n"));
        assert!(text.contains("\n\nHIGH: out of range"));
        assert!(text.ends_with("\n\nwarning: No high trajectory solution"));

        let low_only = solutions.show().trajectories(&[Trajectory::Low]).to_string();
        assert!(!low_only.contains("HIGH"));
    }

    #[test]
    fn test_detailed_report() {
        let solutions = solutions();
        let text = solutions
            .show()
            .trajectories(&[Trajectory::Low])
            .detailed(true)
            .to_string();
        assert!(text.contains("[LOW] charge 1\n  base mill  :      15.00"));
        assert!(text.contains("correction :      +3.00 (altitude delta +200.0 m)"));
        assert!(text.contains("[LOW] charge 12"));
        assert!(!text.contains("CH |"));

        let both = solutions.show().detailed(true).to_string();
        assert!(both.contains("\n\nHIGH: out of range"));
        assert_eq!(
            solutions.show().detailed(true).detailed(false).to_string(),
            solutions.show().to_string()
        );
    }

    #[test]
    fn test_catalog_listing() {
        let info = |system: &str, trajectory, charge| {
            let id = TableId::new(system, trajectory, charge);
            TableInfo {
                entry: id.file_name(),
                id,
            }
        };
        let tables = vec![
            info("M109A6", Trajectory::Low, 1),
            info("M109A6", Trajectory::Low, 3),
            info("M109A6", Trajectory::High, 2),
            info("RM70", Trajectory::Low, 0),
        ];
        assert_eq!(
            CatalogDisplay::new(&tables).to_string(),
            "M109A6 low: charges 1, 3\nM109A6 high: charges 2\nRM70 low: charges 0"
        );
        assert_eq!(CatalogDisplay::new(&[]).to_string(), "No range tables found");
    }
}
