//! Error types for the framework layer

use crate::lifecycle::RunStatus;
use std::path::PathBuf;
use voras_cps::CpsError;
use voras_creds::CredentialsError;
use voras_dss::DssError;
use voras_gherkin::GherkinError;
use voras_kvstore::{KvStoreError, PropertiesError};

/// Errors raised while wiring or running the framework
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// Key/value store failed
    #[error(transparent)]
    Store(#[from] KvStoreError),

    /// Dynamic status store failed
    #[error(transparent)]
    Dss(#[from] DssError),

    /// Configuration property store failed
    #[error(transparent)]
    Cps(#[from] CpsError),

    /// Credentials layer failed
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// Feature parse, bind or pattern failure
    #[error(transparent)]
    Gherkin(#[from] GherkinError),

    /// Bootstrap file could not be read
    #[error("bootstrap io error on {path}: {source}")]
    BootstrapIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bootstrap file is not valid properties text
    #[error("malformed bootstrap file {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: PropertiesError,
    },

    /// Run status move not in the transition table
    #[error("illegal run transition: {from} -> {to}")]
    IllegalTransition { from: RunStatus, to: RunStatus },

    /// Run status changed under us
    #[error("run '{run}' status conflict: expected {expected}, found {found}")]
    StatusConflict {
        run: String,
        expected: String,
        found: String,
    },

    /// Stored status value is not a known status
    #[error("unknown run status '{0}'")]
    UnknownStatus(String),
}

impl FrameworkError {
    /// Create bootstrap I/O error
    pub fn bootstrap_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::BootstrapIo {
            path: path.into(),
            source,
        }
    }

    /// Create status conflict error
    pub fn conflict(run: &str, expected: RunStatus, found: Option<&str>) -> Self {
        Self::StatusConflict {
            run: run.to_string(),
            expected: expected.to_string(),
            found: found.unwrap_or("<absent>").to_string(),
        }
    }

    /// True for failures that leave the framework unusable
    ///
    /// Store and bootstrap failures are fatal; lifecycle conflicts, lookups
    /// and feature problems are not.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(_) | Self::BootstrapIo { .. } | Self::Bootstrap { .. } => true,
            Self::Dss(e) => matches!(e, DssError::Store(_)),
            Self::Cps(e) => matches!(e, CpsError::Store(_)),
            Self::Credentials(e) => matches!(e, CredentialsError::Store(_)),
            _ => false,
        }
    }
}

/// Result type for framework operations
pub type FrameworkResult<T> = Result<T, FrameworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_are_not_fatal() {
        let err = FrameworkError::IllegalTransition {
            from: RunStatus::Finished,
            to: RunStatus::Running,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "illegal run transition: finished -> running");

        let err = FrameworkError::conflict("R1", RunStatus::Queued, None);
        assert!(err.to_string().contains("<absent>"));
    }

    #[test]
    fn bootstrap_io_is_fatal() {
        let err = FrameworkError::bootstrap_io(
            "/nowhere",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(err.is_fatal());
    }
}
