//! Error types for the key/value store
//!
//! Distinguishes three kinds of failure:
//! - I/O against the backing file or its lock
//! - A backing file that is not valid properties syntax
//! - A batch precondition that does not hold (the "match" failure)

use std::path::PathBuf;

/// Syntax error in properties text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct PropertiesError {
    /// 1-based line the logical entry started on
    pub line: usize,
    /// What was wrong
    pub message: String,
}

impl PropertiesError {
    /// Create error for line
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised by [`crate::KeyValueFile`]
#[derive(Debug, thiserror::Error)]
pub enum KvStoreError {
    /// Reading, writing, renaming or locking the backing file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file could not be parsed
    #[error("malformed property file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: PropertiesError,
    },

    /// A batch action precondition was not satisfied; nothing was applied
    #[error("precondition failed for key '{key}': {reason}")]
    Match { key: String, reason: String },
}

impl KvStoreError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create match failure for key
    pub fn mismatch(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Match {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True when a batch was rejected because a precondition did not hold
    #[inline]
    #[must_use]
    pub fn is_match_failure(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Result alias for store operations
pub type KvResult<T> = Result<T, KvStoreError>;
