//! Backing store seam
//!
//! The service only needs get/put/delete and a prefix scan, so anything that
//! can answer those can sit under it.

use std::collections::{BTreeMap, BTreeSet};
use voras_kvstore::{KeyValueFile, KvAction, KvResult};

/// Minimal key/value operations the CPS resolves against
pub trait PropertyStore: Send + Sync {
    /// Value for a full key
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Every entry whose key starts with `prefix`
    fn get_prefix(&self, prefix: &str) -> KvResult<BTreeMap<String, String>>;

    /// Set a full key
    fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Delete a full key
    fn delete(&self, key: &str) -> KvResult<()>;

    /// Apply a batch of full-key actions as one unit
    ///
    /// # Errors
    /// `KvStoreError::Match` if a precondition fails; nothing is applied
    fn perform_actions(&self, actions: &[KvAction]) -> KvResult<()>;

    /// Distinct first key segments
    fn namespaces(&self) -> KvResult<BTreeSet<String>> {
        Ok(self
            .get_prefix("")?
            .keys()
            .filter_map(|k| k.split('.').next())
            .map(str::to_string)
            .collect())
    }
}

impl PropertyStore for KeyValueFile {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        KeyValueFile::get(self, key)
    }

    fn get_prefix(&self, prefix: &str) -> KvResult<BTreeMap<String, String>> {
        KeyValueFile::get_prefix(self, prefix)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        KeyValueFile::set(self, key, value)
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        KeyValueFile::delete(self, key)
    }

    fn perform_actions(&self, actions: &[KvAction]) -> KvResult<()> {
        KeyValueFile::perform_actions(self, actions)
    }

    fn namespaces(&self) -> KvResult<BTreeSet<String>> {
        KeyValueFile::namespaces(self)
    }
}
