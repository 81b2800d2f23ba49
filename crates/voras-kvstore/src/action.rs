//! Batch actions for [`crate::KeyValueFile::perform_actions`]
//!
//! Each action carries its own precondition. A batch is applied to a working
//! copy of the store; the first unmet precondition aborts the batch with
//! [`KvStoreError::Match`] and the working copy is discarded.

use crate::error::{KvResult, KvStoreError};
use crate::store::Transaction;

/// One step of an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvAction {
    /// Set a key that must not exist yet
    Add { key: String, value: String },

    /// Set a key unconditionally
    Update { key: String, value: String },

    /// Set a key whose current value must equal `old_value`
    /// (`None` means the key must be absent)
    Swap {
        key: String,
        old_value: Option<String>,
        new_value: String,
    },

    /// Remove a key; when `old_value` is given the current value must equal it
    Delete {
        key: String,
        old_value: Option<String>,
    },

    /// Remove every key under a prefix
    DeletePrefix { prefix: String },
}

impl KvAction {
    /// Add action
    pub fn add(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Add {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Unconditional update action
    pub fn update(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Update {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Compare-and-swap action
    pub fn swap(key: impl Into<String>, old_value: Option<&str>, new_value: impl Into<String>) -> Self {
        Self::Swap {
            key: key.into(),
            old_value: old_value.map(str::to_string),
            new_value: new_value.into(),
        }
    }

    /// Unconditional delete action
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete {
            key: key.into(),
            old_value: None,
        }
    }

    /// Delete only if the current value matches
    pub fn delete_if(key: impl Into<String>, old_value: impl Into<String>) -> Self {
        Self::Delete {
            key: key.into(),
            old_value: Some(old_value.into()),
        }
    }

    /// Prefix delete action
    pub fn delete_prefix(prefix: impl Into<String>) -> Self {
        Self::DeletePrefix {
            prefix: prefix.into(),
        }
    }

    /// Key or prefix this action targets
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Add { key, .. }
            | Self::Update { key, .. }
            | Self::Swap { key, .. }
            | Self::Delete { key, .. } => key,
            Self::DeletePrefix { prefix } => prefix,
        }
    }

    /// Return a copy with the key (or prefix) prepended by `prefix`
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        let mut out = self.clone();
        match &mut out {
            Self::Add { key, .. }
            | Self::Update { key, .. }
            | Self::Swap { key, .. }
            | Self::Delete { key, .. } => key.insert_str(0, prefix),
            Self::DeletePrefix { prefix: p } => p.insert_str(0, prefix),
        }
        out
    }

    pub(crate) fn apply(&self, txn: &mut Transaction<'_>) -> KvResult<()> {
        match self {
            Self::Add { key, value } => {
                if txn.get(key).is_some() {
                    return Err(KvStoreError::mismatch(key, "key already exists"));
                }
                txn.put(key, value);
            }
            Self::Update { key, value } => txn.put(key, value),
            Self::Swap {
                key,
                old_value,
                new_value,
            } => {
                if txn.get(key) != old_value.as_deref() {
                    return Err(KvStoreError::mismatch(
                        key,
                        format!(
                            "expected {}, found {}",
                            describe(old_value.as_deref()),
                            describe(txn.get(key))
                        ),
                    ));
                }
                txn.put(key, new_value);
            }
            Self::Delete { key, old_value } => {
                if let Some(expected) = old_value {
                    if txn.get(key) != Some(expected.as_str()) {
                        return Err(KvStoreError::mismatch(
                            key,
                            format!(
                                "expected {}, found {}",
                                describe(Some(expected)),
                                describe(txn.get(key))
                            ),
                        ));
                    }
                }
                txn.remove(key);
            }
            Self::DeletePrefix { prefix } => txn.remove_prefix(prefix),
        }
        Ok(())
    }
}

fn describe(value: Option<&str>) -> String {
    value.map_or_else(|| "<absent>".to_string(), |v| format!("'{v}'"))
}
