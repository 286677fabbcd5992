//! # Self-update
//!
//! Replaces the running executable with a newer release described by an update manifest.
//!
//! ## Flow
//! -----------------
//! 1. Fetch the [`UpdateManifest`](manifest::UpdateManifest) from a URL or a local path.
//! 2. Compare its version with the current one ([`compare_versions`]); stop when the remote
//!    version is not strictly newer.
//! 3. Ask for confirmation (skipped with `--yes`).
//! 4. Download the new executable to `<download dir>/<binary name>.new`.
//! 5. Swap it in with [`replace_executable`](replace::replace_executable): the current
//!    binary is kept as `<binary>.bak` and restored if the swap fails.
//!
//! ## Versions
//! -----------------
//! Versions compare on three numeric components `major.minor.patch`. A leading `v` is
//! accepted, missing components count as 0 and parsing stops at the first non-numeric
//! component (`1.x.3` is `1.0.0`).
//!
//! Network access is behind the `self-update` feature; without it only local manifests and
//! local files can be used.
use std::cmp::Ordering;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

pub mod download;
pub mod manifest;
pub mod replace;

use download::FetchPolicy;
use manifest::UpdateManifest;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[vV]?(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Invalid update manifest: {0}")]
    InvalidManifest(String),

    #[cfg(feature = "self-update")]
    #[error("HTTP reqwest error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unable to perform file operation on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to replace {target}: {reason}")]
    Replace { target: Utf8PathBuf, reason: String },

    #[error("Cannot fetch {0}: network download support is disabled in this build")]
    DownloadDisabled(String),

    #[error("Unable to start the download runtime: {0}")]
    Runtime(io::Error),
}

impl PartialEq for UpdateError {
    fn eq(&self, other: &Self) -> bool {
        use UpdateError::*;
        match (self, other) {
            (InvalidManifest(a), InvalidManifest(b)) => a == b,
            #[cfg(feature = "self-update")]
            (Http(_), Http(_)) => true,
            (Io { path: a, .. }, Io { path: b, .. }) => a == b,
            (
                Replace {
                    target: a,
                    reason: ra,
                },
                Replace {
                    target: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (DownloadDisabled(a), DownloadDisabled(b)) => a == b,
            (Runtime(_), Runtime(_)) => true,
            _ => false,
        }
    }
}

/// `major.minor.patch` release number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Lenient parse: never fails, unreadable components are 0.
    pub fn parse(text: &str) -> Self {
        let Some(caps) = VERSION_PATTERN.captures(text.trim()) else {
            return Version::default();
        };
        let component = |i: usize| -> u64 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        Version::new(component(1), component(2), component(3))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compare two version strings component by component.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

/// Whether `remote` is strictly newer than `local`.
pub fn is_newer(remote: &str, local: &str) -> bool {
    compare_versions(remote, local) == Ordering::Greater
}

/// What to do with a fetched manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    UpToDate { remote: String },
    Available(UpdateManifest),
}

/// Decide between staying and updating.
pub fn check_update(manifest: UpdateManifest, current: &str) -> UpdateDecision {
    if is_newer(&manifest.version, current) {
        UpdateDecision::Available(manifest)
    } else {
        UpdateDecision::UpToDate {
            remote: manifest.version,
        }
    }
}

/// Inputs of one update run.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Manifest URL or local path.
    pub manifest: String,
    /// Executable to replace.
    pub binary: Utf8PathBuf,
    /// Where the new executable is downloaded before the swap.
    pub download_dir: Utf8PathBuf,
    pub current_version: String,
    pub policy: FetchPolicy,
}

/// Result of an update run.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    UpToDate { remote: String },
    Declined { remote: String },
    Updated { remote: String, binary: Utf8PathBuf },
}

/// Download location of the new executable: `<download_dir>/<binary name>.new`.
pub fn staging_path(download_dir: &Utf8Path, binary: &Utf8Path) -> Utf8PathBuf {
    let name = binary.file_name().unwrap_or("afcs");
    download_dir.join(format!("{name}.new"))
}

/// Run the whole update flow.
///
/// Arguments
/// -----------------
/// * `options` – Manifest location, target binary, download directory, current version.
/// * `confirm` – Called once a newer version is found; returning `false` aborts.
///
/// Return
/// ----------
/// * The [`UpdateOutcome`], or an [`UpdateError`] if fetching, downloading or replacing
///   failed. A failed swap leaves the previous executable in place.
pub fn run_update(
    options: &UpdateOptions,
    confirm: impl FnOnce(&UpdateManifest) -> bool,
) -> Result<UpdateOutcome, UpdateError> {
    info!("current version: {}", options.current_version);
    info!("checking update manifest {}", options.manifest);

    let text = download::fetch_text(&options.manifest, &options.policy)?;
    let manifest = UpdateManifest::parse(&text)?;

    let manifest = match check_update(manifest, &options.current_version) {
        UpdateDecision::UpToDate { remote } => return Ok(UpdateOutcome::UpToDate { remote }),
        UpdateDecision::Available(manifest) => manifest,
    };

    info!("new version {} available", manifest.version);
    if !confirm(&manifest) {
        return Ok(UpdateOutcome::Declined {
            remote: manifest.version,
        });
    }

    std::fs::create_dir_all(&options.download_dir).map_err(|source| UpdateError::Io {
        path: options.download_dir.to_string(),
        source,
    })?;
    let staged = staging_path(&options.download_dir, &options.binary);

    info!("downloading {} -> {staged}", manifest.url);
    let installed =
        download::download_to(&manifest.url, &staged, &options.policy).and_then(|()| {
            info!("replacing {}", options.binary);
            replace::replace_executable(&staged, &options.binary)
        });
    if let Err(err) = installed {
        if staged.exists() {
            let _ = std::fs::remove_file(&staged);
        }
        return Err(err);
    }

    Ok(UpdateOutcome::Updated {
        remote: manifest.version,
        binary: options.binary.clone(),
    })
}
