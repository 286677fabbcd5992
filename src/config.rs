//! # Runtime configuration
//!
//! [`AfcsConfig`] gathers everything the engine needs beyond the query itself:
//! where the range tables live, capacity limits, the interpolation variant and the
//! **system profiles** (file prefix and per-trajectory charge overrides per weapon system).
//!
//! ## Sources
//! -----------------
//! The configuration is an optional TOML file, searched in this order:
//! 1. an explicit path (`--config` on the command line),
//! 2. the `AFCS_CONFIG` environment variable,
//! 3. `<platform config dir>/afcs/afcs.toml` (e.g. `~/.config/afcs/afcs.toml`),
//!
//! and falls back to built-in defaults when none exists. An explicit or environment path
//! that does not exist is an error; a missing platform file is not.
//!
//! ## Example
//! -----------------
//! ```toml
//! range_tables_dir = "/srv/afcs/rangeTables"
//! interpolation = "lagrange"
//!
//! [limits]
//! max_rows = 4000
//! max_tables = 64
//! solution_limit = 3
//!
//! [systems."RM-70"]
//! file_prefix = "RM70"
//!
//! [systems.M1129]
//! high_charges = [0, 1, 2]
//! ```
//!
//! Profiles given in the file are added to the built-in ones, replacing a built-in profile
//! of the same name.
use std::collections::BTreeMap;
use std::{env, fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::{
    Charge, CONFIG_ENV_VAR, CONFIG_FILENAME, MAX_ROWS, MAX_TABLES, RANGE_TABLE_DIRNAME,
    RANGE_TABLE_ENV_VAR, SOLUTION_LIMIT,
};
use crate::range_table::interpolation::InterpolationMode;
use crate::range_table::Trajectory;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        use ConfigError::*;
        match (self, other) {
            (Io { path: a, .. }, Io { path: b, .. }) => a == b,
            (Parse { path: a, .. }, Parse { path: b, .. }) => a == b,
            (Invalid(a), Invalid(b)) => a == b,
            _ => false,
        }
    }
}

/// Capacity ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Rows accepted per table before the table is rejected.
    pub max_rows: usize,
    /// Tables returned by one discovery pass.
    pub max_tables: usize,
    /// Solutions collected per trajectory.
    pub solution_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_rows: MAX_ROWS,
            max_tables: MAX_TABLES,
            solution_limit: SOLUTION_LIMIT,
        }
    }
}

/// How a weapon system maps onto range-table files.
///
/// Fields
/// -----------------
/// * `file_prefix` – Prefix used in filenames; the system name itself when absent.
/// * `low_charges`, `high_charges` – Charges to try for each trajectory, in order. An empty
///   list means "every charge discovered on disk".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemProfile {
    pub file_prefix: Option<String>,
    pub low_charges: Vec<Charge>,
    pub high_charges: Vec<Charge>,
}

impl SystemProfile {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        SystemProfile {
            file_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn charges(&self, trajectory: Trajectory) -> &[Charge] {
        match trajectory {
            Trajectory::Low => &self.low_charges,
            Trajectory::High => &self.high_charges,
        }
    }
}

/// Built-in weapon systems.
pub fn builtin_systems() -> BTreeMap<String, SystemProfile> {
    BTreeMap::from([
        ("M109A6".to_string(), SystemProfile::default()),
        (
            "M1129".to_string(),
            SystemProfile {
                file_prefix: None,
                low_charges: Vec::new(),
                high_charges: vec![0, 1, 2],
            },
        ),
        ("M119".to_string(), SystemProfile::default()),
        ("RM-70".to_string(), SystemProfile::with_prefix("RM70")),
        ("siala".to_string(), SystemProfile::default()),
    ])
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AfcsConfig {
    pub range_tables_dir: Option<Utf8PathBuf>,
    pub limits: Limits,
    pub interpolation: InterpolationMode,
    pub systems: BTreeMap<String, SystemProfile>,
}

impl Default for AfcsConfig {
    fn default() -> Self {
        AfcsConfig {
            range_tables_dir: None,
            limits: Limits::default(),
            interpolation: InterpolationMode::default(),
            systems: builtin_systems(),
        }
    }
}

impl AfcsConfig {
    /// Parse a TOML document, merging its profiles over the built-in ones.
    ///
    /// Arguments
    /// -----------------
    /// * `text` – TOML content.
    /// * `path` – Where the text came from, for error messages.
    pub fn from_toml_str(text: &str, path: &Utf8Path) -> Result<Self, ConfigError> {
        let mut config: AfcsConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for (name, profile) in builtin_systems() {
            config.systems.entry(name).or_insert(profile);
        }
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        debug!("configuration loaded from {path}");
        Ok(config)
    }

    /// Platform configuration file, `<config dir>/afcs/afcs.toml`.
    pub fn default_path() -> Option<Utf8PathBuf> {
        let base_dirs = BaseDirs::new()?;
        let config_dir = Utf8Path::from_path(base_dirs.config_dir())?;
        Some(config_dir.join("afcs").join(CONFIG_FILENAME))
    }

    /// Locate and load the configuration.
    ///
    /// Arguments
    /// -----------------
    /// * `explicit` – Path given on the command line, if any.
    ///
    /// Return
    /// ----------
    /// * The first configuration found in the search order, or the defaults.
    ///
    /// See also
    /// ------------
    /// * [`AfcsConfig::load_with`] – same search with an injected environment value.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, env::var(CONFIG_ENV_VAR).ok(), Self::default_path())
    }

    /// Search order of [`AfcsConfig::load`] with every input injected.
    pub fn load_with(
        explicit: Option<&Utf8Path>,
        env_path: Option<String>,
        platform_path: Option<Utf8PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env_path.filter(|p| !p.is_empty()) {
            return Self::from_file(Utf8Path::new(&path));
        }
        match platform_path {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_rows == 0 || limits.max_tables == 0 || limits.solution_limit == 0 {
            return Err(ConfigError::Invalid(
                "limits must all be greater than zero".to_string(),
            ));
        }
        if let Some((name, _)) = self
            .systems
            .iter()
            .find(|(_, p)| p.file_prefix.as_deref().is_some_and(|s| s.is_empty() || s.contains('_')))
        {
            return Err(ConfigError::Invalid(format!(
                "file prefix of system {name} must be non-empty and contain no '_'"
            )));
        }
        Ok(())
    }

    /// Range tables directory: command line, then `AFCS_RANGE_TABLES`, then the
    /// configuration file, then `rangeTables` in the working directory.
    pub fn tables_dir(&self, cli: Option<&Utf8Path>) -> Utf8PathBuf {
        self.tables_dir_with(cli, env::var(RANGE_TABLE_ENV_VAR).ok())
    }

    pub fn tables_dir_with(&self, cli: Option<&Utf8Path>, env_dir: Option<String>) -> Utf8PathBuf {
        if let Some(dir) = cli {
            return dir.to_path_buf();
        }
        if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
            return Utf8PathBuf::from(dir);
        }
        self.range_tables_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(RANGE_TABLE_DIRNAME))
    }

    /// Filename prefix of a system; unknown systems use their own name.
    pub fn file_prefix<'a>(&'a self, system: &'a str) -> &'a str {
        self.systems
            .get(system)
            .and_then(|p| p.file_prefix.as_deref())
            .unwrap_or(system)
    }

    /// Charge override list for a system and trajectory, `None` if absent or empty.
    pub fn charge_overrides(&self, system: &str, trajectory: Trajectory) -> Option<&[Charge]> {
        self.systems
            .get(system)
            .map(|p| p.charges(trajectory))
            .filter(|charges| !charges.is_empty())
    }
}
