//! Fetching manifests and executables.
//!
//! A location is either an `http://` / `https://` URL, fetched with `reqwest` on a
//! short-lived tokio runtime, or a local path read from disk. Remote fetches honour a
//! [`FetchPolicy`]: per-request timeout and a bounded number of retries.
use std::fs;
use std::time::Duration;

use camino::Utf8Path;

use super::UpdateError;

/// Timeout and retry policy of remote fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Retries after the first failed attempt.
    pub retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            retries: 2,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `true` for `http://` and `https://` locations.
pub fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Read a text document from a URL or a local path.
pub fn fetch_text(location: &str, policy: &FetchPolicy) -> Result<String, UpdateError> {
    if !is_remote(location) {
        return fs::read_to_string(location).map_err(|source| UpdateError::Io {
            path: location.to_string(),
            source,
        });
    }
    remote::fetch_text(location, policy)
}

/// Copy a URL or a local file to `dest`.
pub fn download_to(location: &str, dest: &Utf8Path, policy: &FetchPolicy) -> Result<(), UpdateError> {
    if !is_remote(location) {
        fs::copy(location, dest).map_err(|source| UpdateError::Io {
            path: location.to_string(),
            source,
        })?;
        return Ok(());
    }
    remote::download_to(location, dest, policy)
}

#[cfg(feature = "self-update")]
mod remote {
    use std::future::Future;

    use camino::Utf8Path;
    use tokio::{fs::File, io::AsyncWriteExt};
    use tokio_stream::StreamExt;
    use tracing::{debug, warn};

    use super::FetchPolicy;
    use crate::update::UpdateError;

    fn runtime() -> Result<tokio::runtime::Runtime, UpdateError> {
        tokio::runtime::Runtime::new().map_err(UpdateError::Runtime)
    }

    fn client(policy: &FetchPolicy) -> Result<reqwest::Client, UpdateError> {
        Ok(reqwest::Client::builder().timeout(policy.timeout).build()?)
    }

    /// Run `attempt` until it succeeds or the retries are exhausted.
    async fn with_retries<T, F, Fut>(
        policy: &FetchPolicy,
        url: &str,
        mut attempt: F,
    ) -> Result<T, UpdateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpdateError>>,
    {
        let mut failures = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if failures < policy.retries => {
                    failures += 1;
                    warn!("fetching {url} failed ({err}), retry {failures}/{}", policy.retries);
                    tokio::time::sleep(policy.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, UpdateError> {
        let response = client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Stream the body of `url` into `path` chunk by chunk.
    async fn download_big_file(
        client: &reqwest::Client,
        url: &str,
        path: &Utf8Path,
    ) -> Result<(), UpdateError> {
        let io_error = |source| UpdateError::Io {
            path: path.to_string(),
            source,
        };

        let mut file = File::create(path).await.map_err(io_error)?;
        debug!("downloading {url}...");

        let mut stream = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await.map_err(io_error)?;
        }

        file.flush().await.map_err(io_error)?;

        debug!("downloaded {url}");
        Ok(())
    }

    pub(super) fn fetch_text(url: &str, policy: &FetchPolicy) -> Result<String, UpdateError> {
        let client = client(policy)?;
        runtime()?.block_on(with_retries(policy, url, || get_text(&client, url)))
    }

    pub(super) fn download_to(
        url: &str,
        dest: &Utf8Path,
        policy: &FetchPolicy,
    ) -> Result<(), UpdateError> {
        let client = client(policy)?;
        runtime()?.block_on(with_retries(policy, url, || {
            download_big_file(&client, url, dest)
        }))
    }
}

#[cfg(not(feature = "self-update"))]
mod remote {
    use camino::Utf8Path;

    use super::FetchPolicy;
    use crate::update::UpdateError;

    pub(super) fn fetch_text(url: &str, _policy: &FetchPolicy) -> Result<String, UpdateError> {
        Err(UpdateError::DownloadDisabled(url.to_string()))
    }

    pub(super) fn download_to(
        url: &str,
        _dest: &Utf8Path,
        _policy: &FetchPolicy,
    ) -> Result<(), UpdateError> {
        Err(UpdateError::DownloadDisabled(url.to_string()))
    }
}
