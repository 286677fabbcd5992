pub mod afcs_errors;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod logging;
pub mod range_table;
pub mod report;
pub mod solver;
pub mod update;
