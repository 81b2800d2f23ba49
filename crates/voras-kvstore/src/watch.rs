//! Watch subscriptions and change dispatch
//!
//! A [`WatchTable`] is a list of `(pattern, callback)` subscriptions. Working
//! out who to notify is a pure function of the mutated key and the table, see
//! [`WatchTable::dispatch_plan`]; the store invokes the plan after it has
//! released its locks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of mutation observed on a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// Key did not exist before
    New,
    /// Key existed with a different value
    Modified,
    /// Key was removed
    Delete,
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchEvent::New => "NEW",
            WatchEvent::Modified => "MODIFIED",
            WatchEvent::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Receiver of change notifications
///
/// Called on the mutating caller's thread; keep it short.
pub trait Watcher: Send + Sync {
    /// A watched key changed
    fn property_modified(
        &self,
        key: &str,
        event: WatchEvent,
        old_value: Option<&str>,
        new_value: Option<&str>,
    );
}

impl<F> Watcher for F
where
    F: Fn(&str, WatchEvent, Option<&str>, Option<&str>) + Send + Sync,
{
    fn property_modified(
        &self,
        key: &str,
        event: WatchEvent,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        self(key, event, old_value, new_value);
    }
}

/// Handle returned by `watch`/`watch_prefix`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(Uuid);

impl WatchId {
    /// Generate new watch ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a subscription listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchPattern {
    /// Exactly this key
    Key(String),
    /// Every key starting with this prefix
    Prefix(String),
}

impl WatchPattern {
    /// Check whether a mutated key is covered
    #[inline]
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            WatchPattern::Key(k) => k == key,
            WatchPattern::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

/// One applied mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Full store key
    pub key: String,
    /// Mutation kind
    pub event: WatchEvent,
    /// Value before, if any
    pub old_value: Option<String>,
    /// Value after, if any
    pub new_value: Option<String>,
}

impl Change {
    /// Classify a before/after pair; `None` when nothing changed
    #[must_use]
    pub fn between(key: &str, old_value: Option<String>, new_value: Option<String>) -> Option<Self> {
        let event = match (&old_value, &new_value) {
            (None, None) => return None,
            (Some(o), Some(n)) if o == n => return None,
            (None, Some(_)) => WatchEvent::New,
            (Some(_), Some(_)) => WatchEvent::Modified,
            (Some(_), None) => WatchEvent::Delete,
        };
        Some(Self {
            key: key.to_string(),
            event,
            old_value,
            new_value,
        })
    }
}

/// Compute the changes turning `before` into `after`, in key order
#[must_use]
pub fn diff(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> Vec<Change> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .filter_map(|k| Change::between(k, before.get(k).cloned(), after.get(k).cloned()))
        .collect()
}

struct Subscription {
    id: WatchId,
    pattern: WatchPattern,
    watcher: Arc<dyn Watcher>,
}

/// Subscription table
///
/// Subscriptions are kept in registration order so delivery to several
/// watchers of one change is deterministic.
#[derive(Default)]
pub struct WatchTable {
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for WatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTable")
            .field(
                "subscriptions",
                &self
                    .subscriptions
                    .iter()
                    .map(|s| (s.id, &s.pattern))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl WatchTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription
    pub fn register(&mut self, pattern: WatchPattern, watcher: Arc<dyn Watcher>) -> WatchId {
        let id = WatchId::new();
        self.subscriptions.push(Subscription {
            id,
            pattern,
            watcher,
        });
        id
    }

    /// Remove a subscription, returning whether it existed
    pub fn remove(&mut self, id: WatchId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Number of subscriptions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Callbacks interested in `key`, in registration order
    #[must_use]
    pub fn matching(&self, key: &str) -> Vec<Arc<dyn Watcher>> {
        self.subscriptions
            .iter()
            .filter(|s| s.pattern.matches(key))
            .map(|s| Arc::clone(&s.watcher))
            .collect()
    }

    /// Pair every change with every callback that must see it
    ///
    /// Changes keep their application order.
    #[must_use]
    pub fn dispatch_plan<'c>(&self, changes: &'c [Change]) -> Vec<(Arc<dyn Watcher>, &'c Change)> {
        changes
            .iter()
            .flat_map(|change| {
                self.matching(&change.key)
                    .into_iter()
                    .map(move |watcher| (watcher, change))
            })
            .collect()
    }
}

/// Invoke a dispatch plan
pub fn deliver(plan: Vec<(Arc<dyn Watcher>, &Change)>) {
    for (watcher, change) in plan {
        watcher.property_modified(
            &change.key,
            change.event,
            change.old_value.as_deref(),
            change.new_value.as_deref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<dyn Watcher>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let watcher: Arc<dyn Watcher> = Arc::new(
            move |key: &str, event: WatchEvent, _old: Option<&str>, _new: Option<&str>| {
                sink.lock().push(format!("{event} {key}"));
            },
        );
        (seen, watcher)
    }

    #[test]
    fn change_classification() {
        assert_eq!(Change::between("k", None, None), None);
        assert_eq!(Change::between("k", Some("a".into()), Some("a".into())), None);
        assert_eq!(
            Change::between("k", None, Some("a".into())).unwrap().event,
            WatchEvent::New
        );
        assert_eq!(
            Change::between("k", Some("a".into()), Some("b".into())).unwrap().event,
            WatchEvent::Modified
        );
        assert_eq!(
            Change::between("k", Some("a".into()), None).unwrap().event,
            WatchEvent::Delete
        );
    }

    #[test]
    fn pattern_matching() {
        assert!(WatchPattern::Key("a.b".into()).matches("a.b"));
        assert!(!WatchPattern::Key("a.b".into()).matches("a.bc"));
        assert!(WatchPattern::Prefix("a.".into()).matches("a.bc"));
        assert!(!WatchPattern::Prefix("a.".into()).matches("ab"));
    }

    #[test]
    fn dispatch_plan_is_pure_and_ordered() {
        let mut table = WatchTable::new();
        let (seen_a, a) = recorder();
        let (seen_b, b) = recorder();
        table.register(WatchPattern::Prefix("run.".into()), a);
        table.register(WatchPattern::Key("run.1".into()), b);

        let changes = vec![
            Change::between("run.1", None, Some("x".into())).unwrap(),
            Change::between("other", None, Some("y".into())).unwrap(),
            Change::between("run.2", None, Some("z".into())).unwrap(),
        ];

        let plan = table.dispatch_plan(&changes);
        assert_eq!(plan.len(), 3);
        deliver(plan);

        assert_eq!(*seen_a.lock(), vec!["NEW run.1", "NEW run.2"]);
        assert_eq!(*seen_b.lock(), vec!["NEW run.1"]);
    }

    #[test]
    fn remove_subscription() {
        let mut table = WatchTable::new();
        let (_, a) = recorder();
        let id = table.register(WatchPattern::Key("k".into()), a);
        assert_eq!(table.len(), 1);
        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert!(table.is_empty());
        assert!(table.matching("k").is_empty());
    }

    #[test]
    fn diff_reports_all_kinds() {
        let mut before = BTreeMap::new();
        before.insert("gone".to_string(), "1".to_string());
        before.insert("kept".to_string(), "1".to_string());
        before.insert("moved".to_string(), "1".to_string());
        let mut after = BTreeMap::new();
        after.insert("kept".to_string(), "1".to_string());
        after.insert("moved".to_string(), "2".to_string());
        after.insert("new".to_string(), "3".to_string());

        let events: Vec<_> = diff(&before, &after)
            .into_iter()
            .map(|c| (c.key, c.event))
            .collect();
        assert_eq!(
            events,
            vec![
                ("gone".to_string(), WatchEvent::Delete),
                ("moved".to_string(), WatchEvent::Modified),
                ("new".to_string(), WatchEvent::New),
            ]
        );
    }
}
