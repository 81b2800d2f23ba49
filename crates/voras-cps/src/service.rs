//! Namespace-scoped property resolution
//!
//! [`ConfigurationPropertyStore`] owns the backing store, the overrides layer
//! and the access log for a run, and hands out one
//! [`ConfigurationPropertyService`] per namespace.

use crate::backend::PropertyStore;
use crate::error::{CpsError, CpsResult};
use crate::overrides::OverridesLayer;
use crate::record::{AccessLog, AccessSource};
use crate::variants::property_variants;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Value returned in place of any `secure` namespace value
pub const REDACTED: &str = "********";

/// Namespace whose values are write-only through the CPS
pub const SECURE_NAMESPACE: &str = "secure";

/// Namespaces that may not be opened as CPS namespaces
pub const RESERVED_NAMESPACES: &[&str] = &["dss"];

static NAMESPACE: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z0-9]+$").expect("static regex"));

/// How a namespace treats reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Values readable
    Normal,
    /// Values redacted on read
    Secure,
}

impl NamespaceKind {
    /// Kind for a namespace name
    #[must_use]
    pub fn of(namespace: &str) -> Self {
        if namespace == SECURE_NAMESPACE {
            Self::Secure
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Secure => "secure",
        })
    }
}

/// Store, overrides and access log shared by every namespace of a run
#[derive(Clone)]
pub struct ConfigurationPropertyStore {
    store: Arc<dyn PropertyStore>,
    overrides: Arc<OverridesLayer>,
    log: Arc<AccessLog>,
}

impl fmt::Debug for ConfigurationPropertyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationPropertyStore")
            .field("overrides", &self.overrides.len())
            .field("accesses", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl ConfigurationPropertyStore {
    /// Create with an empty overrides layer
    #[must_use]
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self {
            store,
            overrides: Arc::new(OverridesLayer::new()),
            log: Arc::new(AccessLog::new()),
        }
    }

    /// With overrides layer
    #[inline]
    #[must_use]
    pub fn with_overrides(mut self, overrides: Arc<OverridesLayer>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Overrides layer
    #[inline]
    #[must_use]
    pub fn overrides(&self) -> &Arc<OverridesLayer> {
        &self.overrides
    }

    /// Access log
    #[inline]
    #[must_use]
    pub fn access_log(&self) -> &Arc<AccessLog> {
        &self.log
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PropertyStore> {
        &self.store
    }

    /// Open a namespace
    ///
    /// # Errors
    /// - `CpsError::InvalidNamespace` unless the name is `[a-z0-9]+`
    /// - `CpsError::ReservedNamespace` for `dss`
    pub fn namespace(&self, namespace: &str) -> CpsResult<ConfigurationPropertyService> {
        if !NAMESPACE.is_match(namespace) {
            return Err(CpsError::InvalidNamespace(namespace.to_string()));
        }
        if RESERVED_NAMESPACES.contains(&namespace) {
            return Err(CpsError::ReservedNamespace(namespace.to_string()));
        }
        Ok(ConfigurationPropertyService {
            namespace: namespace.to_string(),
            kind: NamespaceKind::of(namespace),
            shared: self.clone(),
        })
    }

    /// Namespaces present in the backing store, reserved ones excluded
    ///
    /// # Errors
    /// Store errors
    pub fn namespaces(&self) -> CpsResult<Vec<String>> {
        Ok(self
            .store
            .namespaces()?
            .into_iter()
            .filter(|ns| !RESERVED_NAMESPACES.contains(&ns.as_str()))
            .collect())
    }
}

/// Property access for one namespace
#[derive(Debug, Clone)]
pub struct ConfigurationPropertyService {
    namespace: String,
    kind: NamespaceKind,
    shared: ConfigurationPropertyStore,
}

impl ConfigurationPropertyService {
    /// Namespace name
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespace kind
    #[inline]
    #[must_use]
    pub fn namespace_kind(&self) -> NamespaceKind {
        self.kind
    }

    fn present(&self, value: String) -> String {
        match self.kind {
            NamespaceKind::Normal => value,
            NamespaceKind::Secure => REDACTED.to_string(),
        }
    }

    /// Resolve the most specific value for `prefix`, `suffix` and `infixes`
    ///
    /// Each candidate is checked in the overrides layer, then the store. The
    /// first value found wins, trimmed.
    ///
    /// # Errors
    /// Invalid infixes or store errors; a miss is `Ok(None)`
    pub fn get_property<S: AsRef<str>>(
        &self,
        prefix: &str,
        suffix: &str,
        infixes: &[S],
    ) -> CpsResult<Option<String>> {
        let candidates = property_variants(&self.namespace, prefix, suffix, infixes)?;
        let log = &self.shared.log;

        for key in &candidates {
            let (value, source) = match self.shared.overrides.get(key) {
                Some(v) => (Some(v), AccessSource::Overrides),
                None => (self.shared.store.get(key)?, AccessSource::Cps),
            };
            if let Some(value) = value {
                let value = self.present(value.trim().to_string());
                debug!(key = %key, source = %source, "property resolved");
                log.record(key.clone(), Some(value.clone()), source);
                return Ok(Some(value));
            }
        }

        let most_specific = candidates.into_iter().next().unwrap_or_default();
        debug!(key = %most_specific, "property not found");
        log.record(most_specific, None, AccessSource::Missing);
        Ok(None)
    }

    /// Resolve `<namespace>.<name>` with no infix search
    ///
    /// # Errors
    /// Empty name or store errors; a miss is `Ok(None)`
    pub fn get_property_by_name(&self, name: &str) -> CpsResult<Option<String>> {
        let key = self.full_key(name)?;
        let (value, source) = match self.shared.overrides.get(&key) {
            Some(v) => (Some(v), AccessSource::Overrides),
            None => (self.shared.store.get(&key)?, AccessSource::Cps),
        };
        match value {
            Some(value) => {
                let value = self.present(value.trim().to_string());
                self.shared.log.record(key, Some(value.clone()), source);
                Ok(Some(value))
            }
            None => {
                self.shared.log.record(key, None, AccessSource::Missing);
                Ok(None)
            }
        }
    }

    /// Every key [`get_property`](Self::get_property) would try, in order
    ///
    /// # Errors
    /// Invalid infixes
    pub fn report_property_variants<S: AsRef<str>>(
        &self,
        prefix: &str,
        suffix: &str,
        infixes: &[S],
    ) -> CpsResult<Vec<String>> {
        property_variants(&self.namespace, prefix, suffix, infixes)
    }

    /// Candidate keys joined with `", "`
    ///
    /// # Errors
    /// Invalid infixes
    pub fn report_property_variants_string<S: AsRef<str>>(
        &self,
        prefix: &str,
        suffix: &str,
        infixes: &[S],
    ) -> CpsResult<String> {
        Ok(self
            .report_property_variants(prefix, suffix, infixes)?
            .join(", "))
    }

    /// Entries under `<namespace>.<prefix>`, overrides winning
    ///
    /// Returned keys have the namespace segment removed.
    ///
    /// # Errors
    /// Store errors
    pub fn get_prefixed_properties(&self, prefix: &str) -> CpsResult<BTreeMap<String, String>> {
        let full = format!("{}.{prefix}", self.namespace);
        let mut merged = self.shared.store.get_prefix(&full)?;
        merged.extend(self.shared.overrides.get_prefix(&full));

        let strip = self.namespace.len() + 1;
        Ok(merged
            .into_iter()
            .map(|(k, v)| (k[strip..].to_string(), self.present(v)))
            .collect())
    }

    /// Every entry in the namespace, overrides winning
    ///
    /// # Errors
    /// Store errors
    pub fn get_all_properties(&self) -> CpsResult<BTreeMap<String, String>> {
        self.get_prefixed_properties("")
    }

    /// Set `<namespace>.<name>` in the store
    ///
    /// # Errors
    /// Empty name or store errors
    pub fn set_property(&self, name: &str, value: &str) -> CpsResult<()> {
        let key = self.full_key(name)?;
        self.shared.store.set(&key, value)?;
        debug!(key = %key, "property set");
        Ok(())
    }

    /// Delete `<namespace>.<name>` from the store
    ///
    /// # Errors
    /// Empty name or store errors
    pub fn delete_property(&self, name: &str) -> CpsResult<()> {
        let key = self.full_key(name)?;
        self.shared.store.delete(&key)?;
        debug!(key = %key, "property deleted");
        Ok(())
    }

    fn full_key(&self, name: &str) -> CpsResult<String> {
        if name.trim().is_empty() {
            return Err(CpsError::EmptyName);
        }
        Ok(format!("{}.{name}", self.namespace))
    }
}
