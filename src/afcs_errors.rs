use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::solver::SolveError;
use crate::update::UpdateError;

/// Every failure the `afcs` front-end can report.
#[derive(Error, Debug)]
pub enum AfcsError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error("Unable to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),
}

impl PartialEq for AfcsError {
    fn eq(&self, other: &Self) -> bool {
        use AfcsError::*;
        match (self, other) {
            (Catalog(a), Catalog(b)) => a == b,
            (Solve(a), Solve(b)) => a == b,
            (Config(a), Config(b)) => a == b,
            (Update(a), Update(b)) => a == b,

            // not comparable: same variant is enough
            (Logging(_), Logging(_)) => true,
            (IoError(_), IoError(_)) => true,
            (Json(_), Json(_)) => true,

            (Utf8PathError(a), Utf8PathError(b)) => a == b,
            _ => false,
        }
    }
}

impl AfcsError {
    /// Process exit code for this error.
    ///
    /// `2` for operator input problems (bad query, out of range, missing charge), `1` for
    /// everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            AfcsError::Solve(
                SolveError::InvalidQuery(_)
                | SolveError::OutOfRange { .. }
                | SolveError::NoDataForCharge(_),
            ) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod afcs_errors_tests {
    use super::*;

    #[test]
    fn test_conversions_and_exit_codes() {
        let err: AfcsError = SolveError::NoDataForCharge(5).into();
        assert_eq!(err, AfcsError::Solve(SolveError::NoDataForCharge(5)));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "No range table data for charge 5");

        let err: AfcsError = CatalogError::NoDirectory("rangeTables".into()).into();
        assert_eq!(err.exit_code(), 1);

        let err: AfcsError = std::io::Error::other("boom").into();
        assert_eq!(err, AfcsError::IoError(std::io::Error::other("other")));
    }
}
