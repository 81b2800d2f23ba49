//! The properties-file backed store
//!
//! Every mutation is a read-modify-write of the whole file:
//!
//! ```text
//! in-process mutex → exclusive lock on <file>.lock → read → apply → write tmp → rename
//! ```
//!
//! Reads go straight to the file; the rename makes each write visible in one
//! step so a reader never sees a half-written store.

use crate::action::KvAction;
use crate::error::{KvResult, KvStoreError};
use crate::properties;
use crate::watch::{self, Change, WatchId, WatchPattern, WatchTable, Watcher};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Working copy handed to a mutation closure
///
/// Records every effective change in the order it was made.
#[derive(Debug)]
pub(crate) struct Transaction<'a> {
    data: &'a mut BTreeMap<String, String>,
    changes: Vec<Change>,
}

impl<'a> Transaction<'a> {
    fn new(data: &'a mut BTreeMap<String, String>) -> Self {
        Self {
            data,
            changes: Vec::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub(crate) fn put(&mut self, key: &str, value: &str) {
        let old = self.data.insert(key.to_string(), value.to_string());
        if let Some(change) = Change::between(key, old, Some(value.to_string())) {
            self.changes.push(change);
        }
    }

    pub(crate) fn remove(&mut self, key: &str) {
        let old = self.data.remove(key);
        if let Some(change) = Change::between(key, old, None) {
            self.changes.push(change);
        }
    }

    pub(crate) fn remove_prefix(&mut self, prefix: &str) {
        let doomed: Vec<String> = self
            .data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in doomed {
            self.remove(&key);
        }
    }
}

/// Transactional key/value store persisted as a properties file
///
/// Safe to share between threads (`Arc<KeyValueFile>`) and between
/// processes pointing at the same path.
#[derive(Debug)]
pub struct KeyValueFile {
    path: PathBuf,
    lock_path: PathBuf,
    write_guard: Mutex<()>,
    observed: Mutex<BTreeMap<String, String>>,
    watches: RwLock<WatchTable>,
}

impl KeyValueFile {
    /// Open (creating if needed) the store at `path`
    ///
    /// # Errors
    /// - `KvStoreError::Io` if the file or its directory cannot be created or read
    /// - `KvStoreError::Malformed` if the existing file is not valid properties text
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| KvStoreError::io(parent, e))?;
        }
        if !path.exists() {
            File::create(&path).map_err(|e| KvStoreError::io(&path, e))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lock_path = path.with_file_name(format!("{file_name}.lock"));

        let store = Self {
            path,
            lock_path,
            write_guard: Mutex::new(()),
            observed: Mutex::new(BTreeMap::new()),
            watches: RwLock::new(WatchTable::new()),
        };
        let initial = store.load()?;
        debug!(path = %store.path.display(), entries = initial.len(), "opened key/value store");
        *store.observed.lock() = initial;
        Ok(store)
    }

    /// Backing file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the value for a key
    pub fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// All entries whose key starts with `prefix`
    pub fn get_prefix(&self, prefix: &str) -> KvResult<BTreeMap<String, String>> {
        let mut all = self.load()?;
        Ok(match prefix {
            "" => all,
            _ => all.split_off(prefix).into_iter().take_while(|(k, _)| k.starts_with(prefix)).collect(),
        })
    }

    /// Distinct first key segments present in the store
    pub fn namespaces(&self) -> KvResult<BTreeSet<String>> {
        Ok(self
            .load()?
            .keys()
            .map(|k| k.split('.').next().unwrap_or_default().to_string())
            .collect())
    }

    /// Set one key
    pub fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.transact(|txn| {
            txn.put(key, value);
            Ok(())
        })
    }

    /// Set several keys in one write
    pub fn set_all(&self, entries: &BTreeMap<String, String>) -> KvResult<()> {
        self.transact(|txn| {
            for (key, value) in entries {
                txn.put(key, value);
            }
            Ok(())
        })
    }

    /// Compare-and-swap a single key
    ///
    /// `expected == None` means the key must be absent.
    ///
    /// # Returns
    /// `true` if the swap happened, `false` if the current value differed
    pub fn set_atomic(&self, key: &str, expected: Option<&str>, new_value: &str) -> KvResult<bool> {
        self.set_atomic_with(key, expected, new_value, &BTreeMap::new())
    }

    /// Compare-and-swap a key and, in the same unit, set `others`
    pub fn set_atomic_with(
        &self,
        key: &str,
        expected: Option<&str>,
        new_value: &str,
        others: &BTreeMap<String, String>,
    ) -> KvResult<bool> {
        self.transact(|txn| {
            if txn.get(key) != expected {
                debug!(key, "compare-and-swap rejected");
                return Ok(false);
            }
            txn.put(key, new_value);
            for (k, v) in others {
                txn.put(k, v);
            }
            Ok(true)
        })
    }

    /// Delete one key
    pub fn delete(&self, key: &str) -> KvResult<()> {
        self.transact(|txn| {
            txn.remove(key);
            Ok(())
        })
    }

    /// Delete several keys in one write
    pub fn delete_all<I, S>(&self, keys: I) -> KvResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.transact(|txn| {
            for key in keys {
                txn.remove(key.as_ref());
            }
            Ok(())
        })
    }

    /// Delete every key under a prefix
    pub fn delete_prefix(&self, prefix: &str) -> KvResult<()> {
        self.transact(|txn| {
            txn.remove_prefix(prefix);
            Ok(())
        })
    }

    /// Apply a batch of actions as one atomic unit
    ///
    /// # Errors
    /// `KvStoreError::Match` if any precondition fails; nothing is applied.
    pub fn perform_actions(&self, actions: &[KvAction]) -> KvResult<()> {
        self.transact(|txn| {
            for action in actions {
                action.apply(txn)?;
            }
            Ok(())
        })
    }

    /// Watch one key
    pub fn watch(&self, watcher: Arc<dyn Watcher>, key: &str) -> WatchId {
        self.watches
            .write()
            .register(WatchPattern::Key(key.to_string()), watcher)
    }

    /// Watch every key under a prefix
    pub fn watch_prefix(&self, watcher: Arc<dyn Watcher>, prefix: &str) -> WatchId {
        self.watches
            .write()
            .register(WatchPattern::Prefix(prefix.to_string()), watcher)
    }

    /// Remove a watch, returning whether it was registered
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.watches.write().remove(id)
    }

    /// Re-read the file and notify watchers of changes made elsewhere
    ///
    /// # Returns
    /// Number of changed keys found
    pub fn refresh(&self) -> KvResult<usize> {
        let external = {
            let _guard = self.write_guard.lock();
            let current = self.load()?;
            let mut observed = self.observed.lock();
            let changes = watch::diff(&observed, &current);
            *observed = current;
            changes
        };
        self.notify(&external);
        Ok(external.len())
    }

    fn transact<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> KvResult<T>) -> KvResult<T> {
        let (out, external, local) = {
            let _guard = self.write_guard.lock();
            let _lock = self.lock_exclusive()?;

            let mut data = self.load()?;
            let external = watch::diff(&self.observed.lock(), &data);

            let mut txn = Transaction::new(&mut data);
            let out = f(&mut txn)?;
            let local = txn.changes;

            if !local.is_empty() {
                self.persist(&data)?;
                debug!(path = %self.path.display(), changed = local.len(), "store updated");
            }
            *self.observed.lock() = data;
            (out, external, local)
        };

        self.notify(&external);
        self.notify(&local);
        Ok(out)
    }

    fn notify(&self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        let plan = self.watches.read().dispatch_plan(changes);
        watch::deliver(plan);
    }

    fn load(&self) -> KvResult<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(KvStoreError::io(&self.path, e)),
        };
        properties::parse(&text).map_err(|source| KvStoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> KvResult<()> {
        let tmp = self.lock_path.with_extension("tmp");
        let mut file = File::create(&tmp).map_err(|e| KvStoreError::io(&tmp, e))?;
        file.write_all(properties::render(data).as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| KvStoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| KvStoreError::io(&self.path, e))
    }

    /// Exclusive advisory lock, released when the handle drops
    fn lock_exclusive(&self) -> KvResult<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| KvStoreError::io(&self.lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| KvStoreError::io(&self.lock_path, e))?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchEvent;
    use tempfile::TempDir;

    fn store() -> (TempDir, KeyValueFile) {
        let dir = TempDir::new().unwrap();
        let store = KeyValueFile::open(dir.path().join("dss.properties")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cps.properties");
        let store = KeyValueFile::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn open_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.properties");
        fs::write(&path, "key=\\uZZZZ\n").unwrap();
        let err = KeyValueFile::open(&path).unwrap_err();
        assert!(matches!(err, KvStoreError::Malformed { .. }));
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let (_dir, store) = store();
        store.set("dss.zos.a", "1").unwrap();
        assert_eq!(store.get("dss.zos.a").unwrap().as_deref(), Some("1"));
        store.delete("dss.zos.a").unwrap();
        assert_eq!(store.get("dss.zos.a").unwrap(), None);
    }

    #[test]
    fn get_prefix_is_bounded() {
        let (_dir, store) = store();
        let mut entries = BTreeMap::new();
        entries.insert("a.1".to_string(), "x".to_string());
        entries.insert("a.2".to_string(), "y".to_string());
        entries.insert("ab".to_string(), "z".to_string());
        entries.insert("b.1".to_string(), "w".to_string());
        store.set_all(&entries).unwrap();

        let got = store.get_prefix("a.").unwrap();
        assert_eq!(got.len(), 2);
        assert!(got.contains_key("a.1") && got.contains_key("a.2"));
        assert_eq!(store.get_prefix("").unwrap().len(), 4);
    }

    #[test]
    fn namespaces_are_first_segments() {
        let (_dir, store) = store();
        store.set("zos.image.x", "1").unwrap();
        store.set("framework.y", "2").unwrap();
        store.set("zos.other", "3").unwrap();
        let ns: Vec<_> = store.namespaces().unwrap().into_iter().collect();
        assert_eq!(ns, vec!["framework".to_string(), "zos".to_string()]);
    }

    #[test]
    fn set_atomic_swaps_once() {
        let (_dir, store) = store();
        assert!(store.set_atomic("k", None, "a").unwrap());
        assert!(!store.set_atomic("k", None, "b").unwrap());
        assert!(store.set_atomic("k", Some("a"), "b").unwrap());
        assert!(!store.set_atomic("k", Some("a"), "b").unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn set_atomic_with_others_is_all_or_nothing() {
        let (_dir, store) = store();
        let mut others = BTreeMap::new();
        others.insert("owner".to_string(), "run1".to_string());

        assert!(!store.set_atomic_with("lock", Some("held"), "run1", &others).unwrap());
        assert_eq!(store.get("owner").unwrap(), None);

        assert!(store.set_atomic_with("lock", None, "run1", &others).unwrap());
        assert_eq!(store.get("owner").unwrap().as_deref(), Some("run1"));
    }

    #[test]
    fn perform_actions_rolls_back_on_mismatch() {
        let (_dir, store) = store();
        store.set("existing", "1").unwrap();

        let err = store
            .perform_actions(&[
                KvAction::update("fresh", "1"),
                KvAction::add("existing", "2"),
            ])
            .unwrap_err();
        assert!(err.is_match_failure());
        assert_eq!(store.get("fresh").unwrap(), None);
        assert_eq!(store.get("existing").unwrap().as_deref(), Some("1"));

        store
            .perform_actions(&[
                KvAction::swap("existing", Some("1"), "2"),
                KvAction::add("fresh", "1"),
                KvAction::delete_if("fresh", "1"),
            ])
            .unwrap();
        assert_eq!(store.get("existing").unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("fresh").unwrap(), None);
    }

    #[test]
    fn watchers_see_events_in_order() {
        let (_dir, store) = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.watch_prefix(
            Arc::new(move |key: &str, event: WatchEvent, old: Option<&str>, new: Option<&str>| {
                sink.lock().push((
                    key.to_string(),
                    event,
                    old.map(str::to_string),
                    new.map(str::to_string),
                ));
            }),
            "run.",
        );

        store.set("run.1", "a").unwrap();
        store.set("run.1", "a").unwrap();
        store.set("run.1", "b").unwrap();
        store.set("other", "x").unwrap();
        store.delete("run.1").unwrap();
        assert!(store.unwatch(id));
        store.set("run.2", "c").unwrap();

        let seen = seen.lock();
        let events: Vec<_> = seen.iter().map(|(_, e, _, _)| *e).collect();
        assert_eq!(
            events,
            vec![WatchEvent::New, WatchEvent::Modified, WatchEvent::Delete]
        );
        assert_eq!(seen[1].2.as_deref(), Some("a"));
        assert_eq!(seen[1].3.as_deref(), Some("b"));
    }

    #[test]
    fn refresh_reports_external_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.properties");
        let mine = KeyValueFile::open(&path).unwrap();
        let theirs = KeyValueFile::open(&path).unwrap();

        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        mine.watch(
            Arc::new(move |_: &str, _: WatchEvent, _: Option<&str>, _: Option<&str>| {
                *sink.lock() += 1;
            }),
            "shared.key",
        );

        theirs.set("shared.key", "1").unwrap();
        assert_eq!(*count.lock(), 0);
        assert_eq!(mine.refresh().unwrap(), 1);
        assert_eq!(*count.lock(), 1);
        assert_eq!(mine.refresh().unwrap(), 0);
    }
}
