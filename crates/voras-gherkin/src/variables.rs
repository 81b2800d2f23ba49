//! Per-invocation variable table

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z0-9_.\-]+)>").expect("static regex"));

/// Named values visible to the steps of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: IndexMap<String, String>,
}

impl Variables {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Set a variable, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Set every entry of `other`
    pub fn extend(&mut self, other: impl IntoIterator<Item = (String, String)>) {
        self.values.extend(other);
    }

    /// True if the variable is set
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace `<name>` with the variable's value; unknown names are left as is
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                self.get(&caps[1])
                    .map_or_else(|| caps[0].to_string(), str::to_string)
            })
            .into_owned()
    }
}
