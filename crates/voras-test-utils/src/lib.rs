//! Testing utilities for the Voras workspace
//!
//! Shared fixtures: throwaway on-disk stores, a watcher that records every
//! notification, sample feature files and fixed encryption keys.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use voras_kvstore::{KeyValueFile, WatchEvent, Watcher};

/// Store file name used by fixtures
pub const STORE_FILE: &str = "store.properties";

/// Empty store in a fresh temp dir; keep the `TempDir` alive for the test
pub fn temp_store() -> (TempDir, Arc<KeyValueFile>) {
    let dir = TempDir::new().expect("create temp dir");
    let store = KeyValueFile::open(dir.path().join(STORE_FILE)).expect("open temp store");
    (dir, Arc::new(store))
}

/// Temp store seeded with `entries`
pub fn store_with<'a, I>(entries: I) -> (TempDir, Arc<KeyValueFile>)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let (dir, store) = temp_store();
    let map: BTreeMap<String, String> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    store.set_all(&map).expect("seed temp store");
    (dir, store)
}

/// One recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub key: String,
    pub event: WatchEvent,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl Recorded {
    pub fn new(key: &str, event: WatchEvent, old_value: Option<&str>, new_value: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            event,
            old_value: old_value.map(str::to_string),
            new_value: new_value.map(str::to_string),
        }
    }
}

/// Watcher that keeps every notification it receives
#[derive(Debug, Default)]
pub struct RecordingWatcher {
    seen: Mutex<Vec<Recorded>>,
}

impl RecordingWatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.seen.lock().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.seen.lock().iter().map(|r| r.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl Watcher for RecordingWatcher {
    fn property_modified(
        &self,
        key: &str,
        event: WatchEvent,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        self.seen
            .lock()
            .push(Recorded::new(key, event, old_value, new_value));
    }
}

/// Fixed primary AES-256 key for credential tests
pub const TEST_KEY: [u8; 32] = [7; 32];

/// Fixed fallback AES-256 key for credential tests
pub const TEST_FALLBACK_KEY: [u8; 32] = [42; 32];

/// Smallest valid feature
pub const SIMPLE_FEATURE: &str = "Feature: F\nScenario: S\nGiven a thing\n";

/// Feature with comments, two scenarios and an outline
pub const MIXED_FEATURE: &str = "\
# Sample feature
Feature: Terminal checks

  Scenario: Log something
    Given greeting is test property hello
    Then Write to log \"started\"
    And greeting is \"hi\"

  # outline over two rows
  Scenario Outline: Echo each row
    Then Write to log \"<word>\"
    And word is \"<word>\"

    Examples:
      | word  |
      | alpha |
      | beta  |
";

/// Outline that never declares its examples
pub const OUTLINE_WITHOUT_EXAMPLES: &str = "\
Feature: Broken
Scenario Outline: Missing table
Given a thing
";

/// Examples table outside any outline
pub const EXAMPLES_OUTSIDE_OUTLINE: &str = "\
Feature: Broken
Scenario: Plain
Given a thing
Examples:
| a |
| 1 |
";
