//! # Firing solutions
//!
//! The solver answers a [`FireQuery`] (system, distance, altitude delta, optional trajectory
//! and charge) with the elevation and time of flight of every usable charge.
//!
//! ## Pipeline
//! -----------------
//! 1. Map the system name to its file prefix ([`AfcsConfig::file_prefix`]).
//! 2. Discover the tables of that prefix (and trajectory, if given) in the catalog.
//! 3. Per trajectory, enumerate candidate charges: the profile's override list when it is
//!    non-empty, otherwise the discovered charges in ascending order. A charge filter keeps
//!    only that charge.
//! 4. Load each candidate. Unusable tables are skipped with a warning.
//! 5. Interpolate tables supporting the distance, apply the altitude correction
//!    `mill = base_mill + (altitude_delta / 100) * diff100m`.
//! 6. Stop a trajectory after `solution_limit` solutions, in charge order.
//!
//! ## Failure modes
//! -----------------
//! * [`SolveError::InvalidQuery`] – rejected by [`FireQueryBuilder::build`].
//! * [`SolveError::Catalog`] – no table directory, no table for the system, I/O.
//! * [`SolveError::NoDataForCharge`] – a charge filter matched no loadable table.
//! * [`SolveError::OutOfRange`] – no trajectory produced a solution; carries the envelope of
//!   every table loaded.
//!
//! A trajectory that produced nothing while the other did is not an error: it is reported
//! in [`FireSolutions::warnings`].
use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogError, DirectorySource, TableInfo, TableSource};
use crate::config::AfcsConfig;
use crate::constants::{Charge, Meter, Mil, Second, ALTITUDE_CORRECTION_SPAN};
use crate::range_table::{RangeEnvelope, RangeRow, TableId, Trajectory};

#[derive(Error, Debug, PartialEq)]
pub enum SolveError {
    #[error("Invalid fire query: {0}")]
    InvalidQuery(String),

    #[error("Distance {distance:.2} m is out of range ({})", describe_envelope(.envelope))]
    OutOfRange {
        distance: Meter,
        envelope: Option<RangeEnvelope>,
    },

    #[error("No range table data for charge {0}")]
    NoDataForCharge(Charge),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn describe_envelope(envelope: &Option<RangeEnvelope>) -> String {
    match envelope {
        Some(env) => format!("supported: {env}"),
        None => "no usable range table".to_string(),
    }
}

/// Mil elevation corrected for the altitude difference between gun and target.
///
/// Arguments
/// -----------------
/// * `base_mill` – Interpolated elevation for a level target.
/// * `diff100m` – Mil correction per 100 m of altitude difference.
/// * `altitude_delta` – Own altitude minus target altitude, in meters (sign preserved).
pub fn corrected_mill(base_mill: Mil, diff100m: Mil, altitude_delta: Meter) -> Mil {
    base_mill + (altitude_delta / ALTITUDE_CORRECTION_SPAN) * diff100m
}

/// A fully specified, validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct FireQuery {
    system: String,
    distance: Meter,
    altitude_delta: Meter,
    trajectory: Option<Trajectory>,
    charge: Option<Charge>,
}

impl FireQuery {
    /// Start a query for `system` at `distance` meters, level target, every trajectory and
    /// charge.
    pub fn builder(system: impl Into<String>, distance: Meter) -> FireQueryBuilder {
        FireQueryBuilder::new(system, distance)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn distance(&self) -> Meter {
        self.distance
    }

    pub fn altitude_delta(&self) -> Meter {
        self.altitude_delta
    }

    pub fn trajectory(&self) -> Option<Trajectory> {
        self.trajectory
    }

    pub fn charge(&self) -> Option<Charge> {
        self.charge
    }

    /// Trajectories the query covers, low first.
    pub fn trajectories(&self) -> Vec<Trajectory> {
        match self.trajectory {
            Some(t) => vec![t],
            None => Trajectory::ALL.to_vec(),
        }
    }
}

/// Builder for [`FireQuery`], with validation.
#[derive(Debug, Clone)]
pub struct FireQueryBuilder {
    query: FireQuery,
}

impl FireQueryBuilder {
    pub fn new(system: impl Into<String>, distance: Meter) -> Self {
        FireQueryBuilder {
            query: FireQuery {
                system: system.into(),
                distance,
                altitude_delta: 0.0,
                trajectory: None,
                charge: None,
            },
        }
    }

    /// Own altitude minus target altitude.
    pub fn altitude_delta(mut self, delta: Meter) -> Self {
        self.query.altitude_delta = delta;
        self
    }

    /// Set the altitude delta from both altitudes.
    pub fn altitudes(mut self, own: Meter, target: Meter) -> Self {
        self.query.altitude_delta = own - target;
        self
    }

    pub fn trajectory(mut self, trajectory: Option<Trajectory>) -> Self {
        self.query.trajectory = trajectory;
        self
    }

    pub fn charge(mut self, charge: Option<Charge>) -> Self {
        self.query.charge = charge;
        self
    }

    /// Validate and produce the query.
    ///
    /// Errors
    /// ----------
    /// * [`SolveError::InvalidQuery`] if the system is blank, the distance is not a finite
    ///   positive number or the altitude delta is not finite.
    pub fn build(self) -> Result<FireQuery, SolveError> {
        let q = &self.query;
        if q.system.trim().is_empty() {
            return Err(SolveError::InvalidQuery("system must not be empty".into()));
        }
        if !(q.distance.is_finite() && q.distance > 0.0) {
            return Err(SolveError::InvalidQuery(
                "distance must be a finite number greater than zero".into(),
            ));
        }
        if !q.altitude_delta.is_finite() {
            return Err(SolveError::InvalidQuery(
                "altitude delta must be a finite number".into(),
            ));
        }
        Ok(self.query)
    }
}

/// Firing data for one charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeSolution {
    pub charge: Charge,
    /// Altitude-corrected elevation.
    pub mill: Mil,
    /// Elevation before altitude correction.
    pub base_mill: Mil,
    pub diff100m: Mil,
    pub eta: Second,
}

impl RangeSolution {
    pub fn from_row(charge: Charge, row: &RangeRow, altitude_delta: Meter) -> Self {
        RangeSolution {
            charge,
            mill: corrected_mill(row.mill, row.diff100m, altitude_delta),
            base_mill: row.mill,
            diff100m: row.diff100m,
            eta: row.eta,
        }
    }
}

/// Solutions of a query, per trajectory, in charge order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireSolutions {
    pub system: String,
    pub distance: Meter,
    pub altitude_delta: Meter,
    pub low: Vec<RangeSolution>,
    pub high: Vec<RangeSolution>,
    /// Union of the supported ranges of every table loaded for the query.
    #[serde(skip)]
    pub envelope: Option<RangeEnvelope>,
    pub warnings: Vec<String>,
}

impl FireSolutions {
    fn new(query: &FireQuery) -> Self {
        FireSolutions {
            system: query.system.clone(),
            distance: query.distance,
            altitude_delta: query.altitude_delta,
            low: Vec::new(),
            high: Vec::new(),
            envelope: None,
            warnings: Vec::new(),
        }
    }

    pub fn for_trajectory(&self, trajectory: Trajectory) -> &[RangeSolution] {
        match trajectory {
            Trajectory::Low => &self.low,
            Trajectory::High => &self.high,
        }
    }

    fn for_trajectory_mut(&mut self, trajectory: Trajectory) -> &mut Vec<RangeSolution> {
        match trajectory {
            Trajectory::Low => &mut self.low,
            Trajectory::High => &mut self.high,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty() && self.high.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Query front-end over a table catalog and a configuration.
#[derive(Debug, Clone)]
pub struct Solver<S> {
    catalog: Catalog<S>,
    config: AfcsConfig,
}

impl Solver<DirectorySource> {
    /// Solver over the tables directory resolved from the configuration.
    pub fn from_dir(config: AfcsConfig, root: impl Into<camino::Utf8PathBuf>) -> Self {
        Solver::new(DirectorySource::new(root), config)
    }
}

impl<S: TableSource> Solver<S> {
    pub fn new(source: S, config: AfcsConfig) -> Self {
        Solver {
            catalog: Catalog::new(source, config.limits.max_tables),
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn config(&self) -> &AfcsConfig {
        &self.config
    }

    /// Tables available for a system (display name or prefix) and trajectory.
    pub fn list_available(
        &self,
        system: Option<&str>,
        trajectory: Option<Trajectory>,
    ) -> Result<Vec<TableInfo>, CatalogError> {
        let prefix = system.map(|s| self.config.file_prefix(s));
        self.catalog.discover(prefix, trajectory)
    }

    /// Candidate tables of one trajectory, in the order they must be tried.
    fn candidates(
        &self,
        query: &FireQuery,
        prefix: &str,
        trajectory: Trajectory,
        discovered: &[TableInfo],
    ) -> Vec<TableInfo> {
        let by_charge: BTreeMap<Charge, &TableInfo> = discovered
            .iter()
            .filter(|info| info.id.trajectory == trajectory)
            .map(|info| (info.id.charge, info))
            .collect();

        let charges: Vec<Charge> = match self.config.charge_overrides(&query.system, trajectory) {
            Some(overrides) => overrides.to_vec(),
            None => by_charge.keys().copied().collect(),
        };

        charges
            .into_iter()
            .filter(|charge| query.charge.map_or(true, |wanted| wanted == *charge))
            .map(|charge| match by_charge.get(&charge) {
                Some(info) => (*info).clone(),
                None => {
                    let id = TableId::new(prefix, trajectory, charge);
                    TableInfo {
                        entry: id.file_name(),
                        id,
                    }
                }
            })
            .collect()
    }

    /// Compute the firing solutions of a query.
    ///
    /// Arguments
    /// -----------------
    /// * `query` – A validated [`FireQuery`].
    ///
    /// Return
    /// ----------
    /// * [`FireSolutions`] with at least one solution in some trajectory, or a
    ///   [`SolveError`] (see the module documentation for the failure modes).
    pub fn solve(&self, query: &FireQuery) -> Result<FireSolutions, SolveError> {
        let prefix = self.config.file_prefix(&query.system);
        let discovered = self.catalog.discover(Some(prefix), query.trajectory)?;
        let limits = self.config.limits;
        let mode = self.config.interpolation;

        let mut solutions = FireSolutions::new(query);
        let mut trajectory_envelopes: BTreeMap<Trajectory, Option<RangeEnvelope>> =
            BTreeMap::new();
        let mut charge_found = false;

        for trajectory in query.trajectories() {
            let mut trajectory_envelope = None;

            for info in self.candidates(query, prefix, trajectory, &discovered) {
                if solutions.for_trajectory(trajectory).len() >= limits.solution_limit {
                    break;
                }

                let table = match self.catalog.load(&info, limits.max_rows) {
                    Ok(table) => table,
                    Err(err) => {
                        solutions.warn(format!("Skipping {}: {err}", info.id));
                        continue;
                    }
                };
                let Some(envelope) = table.envelope() else {
                    solutions.warn(format!("Skipping {}: table is empty", info.id));
                    continue;
                };

                charge_found = true;
                trajectory_envelope = RangeEnvelope::merge(trajectory_envelope, envelope);
                solutions.envelope = RangeEnvelope::merge(solutions.envelope, envelope);

                let Some(row) = mode.interpolate(&table, query.distance) else {
                    debug!("{} does not cover {:.2} m ({envelope})", info.id, query.distance);
                    continue;
                };

                debug!("{} selected for {:.2} m", info.id, query.distance);
                solutions
                    .for_trajectory_mut(trajectory)
                    .push(RangeSolution::from_row(
                        info.id.charge,
                        &row,
                        query.altitude_delta,
                    ));
            }

            trajectory_envelopes.insert(trajectory, trajectory_envelope);
        }

        if let (Some(charge), false) = (query.charge, charge_found) {
            return Err(SolveError::NoDataForCharge(charge));
        }

        if solutions.is_empty() {
            return Err(SolveError::OutOfRange {
                distance: query.distance,
                envelope: solutions.envelope,
            });
        }

        for (trajectory, envelope) in trajectory_envelopes {
            if solutions.for_trajectory(trajectory).is_empty() {
                solutions.warn(format!(
                    "No {trajectory} trajectory solution at {:.2} m ({})",
                    query.distance,
                    describe_envelope(&envelope)
                ));
            }
        }

        Ok(solutions)
    }
}
