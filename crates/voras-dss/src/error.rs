//! Error types for the dynamic status store

use voras_kvstore::KvStoreError;

/// Errors raised by DSS views
#[derive(Debug, thiserror::Error)]
pub enum DssError {
    /// Backing store failed
    #[error("store error: {0}")]
    Store(KvStoreError),

    /// An action batch precondition did not hold; nothing was applied
    #[error("dss match failure on '{key}': {reason}")]
    Match { key: String, reason: String },

    /// Namespace is not `[a-z0-9]+`
    #[error("invalid dss namespace: '{0}'")]
    InvalidNamespace(String),

    /// Resource key or run name unusable as a key segment
    #[error("invalid dss key segment: '{0}'")]
    InvalidSegment(String),

    /// A CAS loop ran out of attempts or time
    #[error("compare-and-swap retries exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// Resource string template could not be expanded
    #[error("invalid resource template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Not enough free resources in a pool
    #[error("resource pool exhausted: requested {requested}, available {available}")]
    PoolExhausted { requested: usize, available: usize },
}

impl From<KvStoreError> for DssError {
    fn from(value: KvStoreError) -> Self {
        match value {
            KvStoreError::Match { key, reason } => Self::Match { key, reason },
            other => Self::Store(other),
        }
    }
}

impl DssError {
    /// True when a batch was rejected because a precondition did not hold
    #[inline]
    #[must_use]
    pub fn is_match_failure(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    /// Create template error
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for DSS operations
pub type DssResult<T> = Result<T, DssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_maps_to_match() {
        let err: DssError = KvStoreError::mismatch("dss.zos.x", "key already exists").into();
        assert!(err.is_match_failure());
        assert!(err.to_string().contains("dss.zos.x"));
    }

    #[test]
    fn io_maps_to_store() {
        let err: DssError = KvStoreError::io("/x", std::io::Error::other("disk")).into();
        assert!(matches!(err, DssError::Store(_)));
        assert!(!err.is_match_failure());
    }
}
