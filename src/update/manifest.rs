use serde::{Deserialize, Serialize};

use super::UpdateError;

/// Release description published next to the executables.
///
/// ```json
/// {"version": "1.26.0", "url": "https://example.org/afcs-1.26.0", "notes": "optional"}
/// ```
///
/// Unknown keys are ignored so the manifest can carry more metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    pub version: String,
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateManifest {
    /// Parse the JSON text of a manifest.
    ///
    /// Errors
    /// ----------
    /// * [`UpdateError::InvalidManifest`] if the JSON is malformed, or `version` / `url`
    ///   are missing or blank.
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        let manifest: UpdateManifest = serde_json::from_str(text)
            .map_err(|err| UpdateError::InvalidManifest(err.to_string()))?;

        if manifest.version.trim().is_empty() {
            return Err(UpdateError::InvalidManifest("version is empty".into()));
        }
        if manifest.url.trim().is_empty() {
            return Err(UpdateError::InvalidManifest("url is empty".into()));
        }
        Ok(manifest)
    }
}
