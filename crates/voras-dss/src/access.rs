//! Prefixed key access
//!
//! [`ScopedStore`] is a key prefix over a shared [`KeyValueFile`]. Callers use
//! unprefixed keys; the prefix is added on the way in and stripped on the way
//! out, including from keys handed to watch callbacks. Keys are never
//! inspected for an existing prefix, so nothing is double-prefixed as long as
//! callers stick to unprefixed keys.

use crate::error::DssResult;
use crate::retry::{cas_retry, CasAttempt, RetryBudget};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use voras_kvstore::{KeyValueFile, WatchEvent, WatchId, Watcher};

/// A prefixed window onto the shared store
#[derive(Debug, Clone)]
pub struct ScopedStore {
    store: Arc<KeyValueFile>,
    prefix: String,
}

impl ScopedStore {
    /// Create view; `prefix` should end with `.`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<KeyValueFile>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Full key prefix of this view
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Shared backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<KeyValueFile> {
        &self.store
    }

    /// Translate a view key into a store key
    #[inline]
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn strip<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(self.prefix.as_str()).unwrap_or(key)
    }
}

/// Forwards notifications with the view prefix removed from the key
struct StrippingWatcher {
    prefix: String,
    inner: Arc<dyn Watcher>,
}

impl Watcher for StrippingWatcher {
    fn property_modified(
        &self,
        key: &str,
        event: WatchEvent,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        let key = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
        self.inner.property_modified(key, event, old_value, new_value);
    }
}

/// Key operations shared by every DSS view
///
/// Implementors only say which [`ScopedStore`] they wrap.
pub trait DssKeyAccess {
    /// The prefixed view backing this accessor
    fn scope(&self) -> &ScopedStore;

    /// Get a value
    fn get(&self, key: &str) -> DssResult<Option<String>> {
        let scope = self.scope();
        Ok(scope.store.get(&scope.full_key(key))?)
    }

    /// All entries under a key prefix, keys relative to this view
    fn get_prefix(&self, key_prefix: &str) -> DssResult<BTreeMap<String, String>> {
        let scope = self.scope();
        Ok(scope
            .store
            .get_prefix(&scope.full_key(key_prefix))?
            .into_iter()
            .map(|(k, v)| (scope.strip(&k).to_string(), v))
            .collect())
    }

    /// Set a value
    fn put(&self, key: &str, value: &str) -> DssResult<()> {
        let scope = self.scope();
        Ok(scope.store.set(&scope.full_key(key), value)?)
    }

    /// Set several values in one write
    fn put_all(&self, entries: &BTreeMap<String, String>) -> DssResult<()> {
        let scope = self.scope();
        let full = entries
            .iter()
            .map(|(k, v)| (scope.full_key(k), v.clone()))
            .collect();
        Ok(scope.store.set_all(&full)?)
    }

    /// Compare-and-swap; `old_value == None` means the key must be absent
    fn put_swap(&self, key: &str, old_value: Option<&str>, new_value: &str) -> DssResult<bool> {
        self.put_swap_with(key, old_value, new_value, &BTreeMap::new())
    }

    /// Compare-and-swap that also sets `others` when it succeeds
    fn put_swap_with(
        &self,
        key: &str,
        old_value: Option<&str>,
        new_value: &str,
        others: &BTreeMap<String, String>,
    ) -> DssResult<bool> {
        let scope = self.scope();
        let others = others
            .iter()
            .map(|(k, v)| (scope.full_key(k), v.clone()))
            .collect();
        Ok(scope
            .store
            .set_atomic_with(&scope.full_key(key), old_value, new_value, &others)?)
    }

    /// Read-compute-swap loop on one key
    ///
    /// `next` sees the current value and returns the value to store, or
    /// `None` to give up. Returns the stored value, or `None` if abandoned.
    fn compare_and_update<F>(&self, key: &str, budget: &RetryBudget, mut next: F) -> DssResult<Option<String>>
    where
        F: FnMut(Option<&str>) -> Option<String>,
    {
        cas_retry(budget, |_| {
            let current = self.get(key)?;
            let Some(desired) = next(current.as_deref()) else {
                return Ok(CasAttempt::Abandon);
            };
            if self.put_swap(key, current.as_deref(), &desired)? {
                Ok(CasAttempt::Done(desired))
            } else {
                Ok(CasAttempt::Retry)
            }
        })
    }

    /// Delete a key
    fn delete(&self, key: &str) -> DssResult<()> {
        let scope = self.scope();
        Ok(scope.store.delete(&scope.full_key(key))?)
    }

    /// Delete several keys in one write
    fn delete_all(&self, keys: &BTreeSet<String>) -> DssResult<()> {
        let scope = self.scope();
        Ok(scope
            .store
            .delete_all(keys.iter().map(|k| scope.full_key(k)))?)
    }

    /// Delete everything under a key prefix
    fn delete_prefix(&self, key_prefix: &str) -> DssResult<()> {
        let scope = self.scope();
        Ok(scope.store.delete_prefix(&scope.full_key(key_prefix))?)
    }

    /// Watch one key; callbacks receive view-relative keys
    fn watch(&self, watcher: Arc<dyn Watcher>, key: &str) -> WatchId {
        let scope = self.scope();
        scope.store.watch(
            Arc::new(StrippingWatcher {
                prefix: scope.prefix.clone(),
                inner: watcher,
            }),
            &scope.full_key(key),
        )
    }

    /// Watch a key prefix; callbacks receive view-relative keys
    fn watch_prefix(&self, watcher: Arc<dyn Watcher>, key_prefix: &str) -> WatchId {
        let scope = self.scope();
        scope.store.watch_prefix(
            Arc::new(StrippingWatcher {
                prefix: scope.prefix.clone(),
                inner: watcher,
            }),
            &scope.full_key(key_prefix),
        )
    }

    /// Remove a watch
    fn unwatch(&self, id: WatchId) -> bool {
        self.scope().store.unwatch(id)
    }
}

impl DssKeyAccess for ScopedStore {
    fn scope(&self) -> &ScopedStore {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use voras_test_utils::temp_store;

    #[test]
    fn keys_are_prefixed_and_stripped() {
        let (_dir, store) = temp_store();
        let view = ScopedStore::new(Arc::clone(&store), "dss.zos.");

        view.put("image.MV2C.state", "up").unwrap();
        assert_eq!(
            store.get("dss.zos.image.MV2C.state").unwrap().as_deref(),
            Some("up")
        );

        let listed = view.get_prefix("image.").unwrap();
        assert_eq!(listed.keys().collect::<Vec<_>>(), vec!["image.MV2C.state"]);
    }

    #[test]
    fn watch_keys_are_relative() {
        let (_dir, store) = temp_store();
        let view = ScopedStore::new(Arc::clone(&store), "dss.zos.");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        view.watch_prefix(
            Arc::new(move |key: &str, _: WatchEvent, _: Option<&str>, _: Option<&str>| {
                sink.lock().push(key.to_string());
            }),
            "image.",
        );

        view.put("image.A", "1").unwrap();
        store.set("dss.other.image.A", "1").unwrap();

        assert_eq!(*seen.lock(), vec!["image.A".to_string()]);
    }

    #[test]
    fn compare_and_update_abandons() {
        let (_dir, store) = temp_store();
        let view = ScopedStore::new(store, "dss.zos.");
        let budget = RetryBudget::default();

        let stored = view
            .compare_and_update("count", &budget, |cur| {
                Some(cur.map_or(1, |c| c.parse::<u32>().unwrap() + 1).to_string())
            })
            .unwrap();
        assert_eq!(stored.as_deref(), Some("1"));

        let abandoned = view.compare_and_update("count", &budget, |_| None).unwrap();
        assert_eq!(abandoned, None);
        assert_eq!(view.get("count").unwrap().as_deref(), Some("1"));
    }
}
