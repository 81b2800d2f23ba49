//! In-memory overrides checked before the store
//!
//! Never persisted. One layer lives for one run.

use crate::error::{CpsError, CpsResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use voras_kvstore::properties;

/// Override values keyed by full property key
#[derive(Debug, Default)]
pub struct OverridesLayer {
    values: RwLock<BTreeMap<String, String>>,
}

impl OverridesLayer {
    /// Create empty layer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create layer from existing entries
    #[must_use]
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Load from a properties file; a missing file gives an empty layer
    ///
    /// # Errors
    /// I/O failure other than not-found, or malformed content
    pub fn from_file(path: impl AsRef<Path>) -> CpsResult<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no overrides file");
                return Ok(Self::new());
            }
            Err(e) => return Err(CpsError::overrides_io(path, e)),
        };
        let values = properties::parse(&text).map_err(|source| CpsError::OverridesMalformed {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), count = values.len(), "loaded overrides");
        Ok(Self::from_map(values))
    }

    /// Override value for a full key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Overrides whose key starts with `prefix`
    #[must_use]
    pub fn get_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.values
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Set an override
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Remove an override, returning the old value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }

    /// Number of overrides
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// True if no overrides are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
