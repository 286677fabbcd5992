//! # Constants and type definitions for AFCS
//!
//! This module centralizes the **engine limits**, **file naming conventions** and
//! **common type aliases** used throughout the `afcs` library.
//!
//! ## Overview
//!
//! - Capacity ceilings protecting the loader and the catalog
//! - Range-table filename fragments and the default tables directory
//! - Unit aliases used in signatures (meters, mils, seconds)
//!
//! Every limit here is only a default: [`crate::config::Limits`] carries the values
//! actually used at runtime and can be overridden from the configuration file.

// -------------------------------------------------------------------------------------------------
// Units
// -------------------------------------------------------------------------------------------------

/// Distance or altitude in meters
pub type Meter = f64;

/// Angular elevation in mils
pub type Mil = f64;

/// Time of flight in seconds
pub type Second = f64;

/// Propellant charge number
pub type Charge = u32;

/// Altitude span (meters) the `diff100m` column is expressed against
pub const ALTITUDE_CORRECTION_SPAN: Meter = 100.0;

// -------------------------------------------------------------------------------------------------
// Capacity limits
// -------------------------------------------------------------------------------------------------

/// Maximum number of rows accepted from a single range table
pub const MAX_ROWS: usize = 4000;

/// Maximum number of tables returned by a single discovery pass
pub const MAX_TABLES: usize = 64;

/// Maximum number of solutions collected per trajectory
pub const SOLUTION_LIMIT: usize = 3;

// -------------------------------------------------------------------------------------------------
// Files and directories
// -------------------------------------------------------------------------------------------------

/// Directory holding the operator-supplied CSV files
pub const RANGE_TABLE_DIRNAME: &str = "rangeTables";

/// Marker between the system prefix and the trajectory in a table filename
pub const RANGE_TABLE_MARKER: &str = "rangeTable";

/// Extension of a range table file
pub const RANGE_TABLE_EXTENSION: &str = "csv";

/// Name of the configuration file inside the platform config directory
pub const CONFIG_FILENAME: &str = "afcs.toml";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "AFCS_CONFIG";

/// Environment variable pointing at the range tables directory
pub const RANGE_TABLE_ENV_VAR: &str = "AFCS_RANGE_TABLES";

/// Version of this build, compared against update manifests
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
