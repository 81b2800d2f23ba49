//! Namespace, resource and run views
//!
//! Key layout:
//!
//! ```text
//! dss.<namespace>.<key>                                   DynamicStatusStore
//! dss.framework.resource.<namespace>.<resource>.<key>     DynamicResource
//! dss.framework.run.<run>.<key>                           DynamicRun
//! ```

use crate::access::{DssKeyAccess, ScopedStore};
use crate::action::DssAction;
use crate::error::{DssError, DssResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use voras_kvstore::{KeyValueFile, KvAction};

/// Root of every DSS key
pub const DSS_ROOT: &str = "dss.";

/// Root of the shared resource tree
pub const RESOURCE_ROOT: &str = "dss.framework.resource.";

/// Root of run state
pub const RUN_ROOT: &str = "dss.framework.run.";

static NAMESPACE: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z0-9]+$").expect("static regex"));

/// Check a DSS namespace name
///
/// # Errors
/// `DssError::InvalidNamespace` unless the name matches `[a-z0-9]+`
pub fn validate_namespace(namespace: &str) -> DssResult<()> {
    if NAMESPACE.is_match(namespace) {
        Ok(())
    } else {
        Err(DssError::InvalidNamespace(namespace.to_string()))
    }
}

fn validate_segment(segment: &str) -> DssResult<()> {
    let bad = segment.is_empty()
        || segment.starts_with('.')
        || segment.ends_with('.')
        || segment.chars().any(|c| c.is_whitespace() || c == '=' || c == ':');
    if bad {
        Err(DssError::InvalidSegment(segment.to_string()))
    } else {
        Ok(())
    }
}

/// Namespace-scoped view over the shared status store
#[derive(Debug, Clone)]
pub struct DynamicStatusStore {
    namespace: String,
    scope: ScopedStore,
    resource_prefix: String,
}

impl DynamicStatusStore {
    /// Open the view for `namespace`
    ///
    /// # Errors
    /// `DssError::InvalidNamespace` if the name is not `[a-z0-9]+`
    pub fn new(store: Arc<KeyValueFile>, namespace: &str) -> DssResult<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            scope: ScopedStore::new(store, format!("{DSS_ROOT}{namespace}.")),
            resource_prefix: format!("{RESOURCE_ROOT}{namespace}."),
        })
    }

    /// Namespace name
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// View of one managed resource, visible to dashboards
    ///
    /// # Errors
    /// `DssError::InvalidSegment` for an empty or malformed resource key
    pub fn dynamic_resource(&self, resource_key: &str) -> DssResult<DynamicResource> {
        validate_segment(resource_key)?;
        Ok(DynamicResource {
            resource_key: resource_key.to_string(),
            scope: ScopedStore::new(
                Arc::clone(self.scope.store()),
                format!("{}{resource_key}.", self.resource_prefix),
            ),
        })
    }

    /// View of one run's shared state
    ///
    /// # Errors
    /// `DssError::InvalidSegment` for an empty or malformed run name
    pub fn dynamic_run(&self, run_name: &str) -> DssResult<DynamicRun> {
        DynamicRun::new(Arc::clone(self.scope.store()), run_name)
    }

    /// Apply a batch atomically across namespace and resource keys
    ///
    /// # Errors
    /// `DssError::Match` if any precondition fails; nothing is applied
    pub fn perform_actions(&self, actions: &[DssAction]) -> DssResult<()> {
        let resolved: Vec<KvAction> = actions
            .iter()
            .map(|a| a.resolve(self.scope.prefix(), &self.resource_prefix))
            .collect();
        debug!(namespace = %self.namespace, actions = resolved.len(), "performing dss actions");
        Ok(self.scope.store().perform_actions(&resolved)?)
    }
}

impl DssKeyAccess for DynamicStatusStore {
    fn scope(&self) -> &ScopedStore {
        &self.scope
    }
}

/// View rooted at `dss.framework.resource.<namespace>.<resource>.`
#[derive(Debug, Clone)]
pub struct DynamicResource {
    resource_key: String,
    scope: ScopedStore,
}

impl DynamicResource {
    /// Resource key this view is rooted at
    #[inline]
    #[must_use]
    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }
}

impl DssKeyAccess for DynamicResource {
    fn scope(&self) -> &ScopedStore {
        &self.scope
    }
}

/// View rooted at `dss.framework.run.<run>.`
#[derive(Debug, Clone)]
pub struct DynamicRun {
    run_name: String,
    scope: ScopedStore,
}

impl DynamicRun {
    /// Open the view for `run_name`
    ///
    /// # Errors
    /// `DssError::InvalidSegment` for an empty or malformed run name
    pub fn new(store: Arc<KeyValueFile>, run_name: &str) -> DssResult<Self> {
        validate_segment(run_name)?;
        if run_name.contains('.') {
            return Err(DssError::InvalidSegment(run_name.to_string()));
        }
        Ok(Self {
            run_name: run_name.to_string(),
            scope: ScopedStore::new(store, format!("{RUN_ROOT}{run_name}.")),
        })
    }

    /// Run name
    #[inline]
    #[must_use]
    pub fn run_name(&self) -> &str {
        &self.run_name
    }
}

impl DssKeyAccess for DynamicRun {
    fn scope(&self) -> &ScopedStore {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voras_test_utils::temp_store;

    #[test]
    fn namespace_validation() {
        assert!(validate_namespace("zos").is_ok());
        assert!(validate_namespace("zos2").is_ok());
        assert!(validate_namespace("").is_err());
        assert!(validate_namespace("Zos").is_err());
        assert!(validate_namespace("zos.image").is_err());
    }

    #[test]
    fn resource_view_prefix() {
        let (_dir, store) = temp_store();
        let dss = DynamicStatusStore::new(Arc::clone(&store), "zos").unwrap();
        let res = dss.dynamic_resource("userid.ABC").unwrap();
        res.put("run", "U1234").unwrap();

        assert_eq!(
            store
                .get("dss.framework.resource.zos.userid.ABC.run")
                .unwrap()
                .as_deref(),
            Some("U1234")
        );
        assert_eq!(res.resource_key(), "userid.ABC");
        assert!(dss.dynamic_resource("").is_err());
    }

    #[test]
    fn run_view_prefix() {
        let (_dir, store) = temp_store();
        let dss = DynamicStatusStore::new(Arc::clone(&store), "framework").unwrap();
        let run = dss.dynamic_run("U123").unwrap();
        run.put("status", "queued").unwrap();
        assert_eq!(
            store.get("dss.framework.run.U123.status").unwrap().as_deref(),
            Some("queued")
        );
        assert!(dss.dynamic_run("a.b").is_err());
    }

    #[test]
    fn namespaces_do_not_see_each_other() {
        let (_dir, store) = temp_store();
        let zos = DynamicStatusStore::new(Arc::clone(&store), "zos").unwrap();
        let cics = DynamicStatusStore::new(Arc::clone(&store), "cics").unwrap();

        zos.put("slot", "1").unwrap();
        assert_eq!(cics.get("slot").unwrap(), None);
        assert!(cics.get_prefix("").unwrap().is_empty());
    }
}
