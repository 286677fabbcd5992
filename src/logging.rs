//! Logging setup for the `afcs` binary.
//!
//! Diagnostics go to **stderr** so that reports printed on stdout stay clean for piping.
//! The level comes from `RUST_LOG` when set, otherwise from the number of `-v` flags.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Default filter directive for a verbosity count.
///
/// * `0` – `warn`
/// * `1` – `info`
/// * `2` – `debug`
/// * `3+` – `trace`
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbosity: u8) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(7), "trace");
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logging(0);
        assert!(init_logging(0).is_err());
    }
}
