//! Record of every property lookup made during a run
//!
//! Exported alongside results so a run can be reproduced with the same
//! configuration.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use voras_kvstore::properties;

/// Where a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessSource {
    /// Overrides layer
    Overrides,
    /// Backing store
    Cps,
    /// No candidate key had a value
    Missing,
}

impl fmt::Display for AccessSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overrides => "overrides",
            Self::Cps => "cps",
            Self::Missing => "missing",
        })
    }
}

/// One lookup outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// Key that matched, or the most specific key tried on a miss
    pub key: String,
    /// Value returned, if any
    pub value: Option<String>,
    /// Source of the value
    pub source: AccessSource,
}

/// Append-only lookup log shared by every namespace of a run
#[derive(Debug, Default)]
pub struct AccessLog {
    records: Mutex<Vec<AccessRecord>>,
}

impl AccessLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(&self, key: impl Into<String>, value: Option<String>, source: AccessSource) {
        self.records.lock().push(AccessRecord {
            key: key.into(),
            value,
            source,
        });
    }

    /// Snapshot of all records in order
    #[must_use]
    pub fn records(&self) -> Vec<AccessRecord> {
        self.records.lock().clone()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Hits as properties text, last value per key
    #[must_use]
    pub fn export_properties(&self) -> String {
        let hits: BTreeMap<String, String> = self
            .records
            .lock()
            .iter()
            .filter_map(|r| r.value.clone().map(|v| (r.key.clone(), v)))
            .collect();
        properties::render(&hits)
    }
}
