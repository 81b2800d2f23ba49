//! Error types for the configuration property store

use voras_kvstore::{KvStoreError, PropertiesError};

/// Errors raised by CPS operations
#[derive(Debug, thiserror::Error)]
pub enum CpsError {
    /// Backing store failed
    #[error("store error: {0}")]
    Store(#[from] KvStoreError),

    /// Overrides file could not be read
    #[error("failed to read overrides file {path}: {source}")]
    OverridesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Overrides file is not valid properties text
    #[error("malformed overrides file {path}: {source}")]
    OverridesMalformed {
        path: String,
        #[source]
        source: PropertiesError,
    },

    /// Namespace name is not `[a-z0-9]+`
    #[error("invalid cps namespace: '{0}'")]
    InvalidNamespace(String),

    /// Namespace belongs to another store
    #[error("namespace '{0}' is reserved")]
    ReservedNamespace(String),

    /// An infix was empty or only whitespace
    #[error("infix at position {index} is empty")]
    EmptyInfix { index: usize },

    /// An infix contained a key separator
    #[error("infix '{infix}' contains '.'")]
    DottedInfix { infix: String },

    /// Property name or prefix was empty
    #[error("property name must not be empty")]
    EmptyName,
}

impl CpsError {
    /// Create overrides I/O error
    pub fn overrides_io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::OverridesIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// True for argument errors the caller can fix
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidNamespace(_)
                | Self::ReservedNamespace(_)
                | Self::EmptyInfix { .. }
                | Self::DottedInfix { .. }
                | Self::EmptyName
        )
    }
}

/// Result alias for CPS operations
pub type CpsResult<T> = Result<T, CpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors() {
        assert!(CpsError::EmptyInfix { index: 1 }.is_usage_error());
        assert!(CpsError::ReservedNamespace("dss".into()).is_usage_error());
        let io = CpsError::overrides_io("/x", std::io::Error::other("gone"));
        assert!(!io.is_usage_error());
        assert!(io.to_string().contains("/x"));
    }
}
