//! Scoped actions for atomic multi-key updates
//!
//! A [`DssAction`] wraps a store action whose key is relative to either the
//! namespace (`dss.<ns>.`) or the namespace's resource tree
//! (`dss.framework.resource.<ns>.`). The scope is resolved when the batch is
//! dispatched, so one batch can touch both.

use voras_kvstore::KvAction;

/// Which key tree an action addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionScope {
    /// Namespace-private keys
    Namespace,
    /// Shared resource-tracking keys
    Resource,
}

/// One unit of a DSS action batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DssAction {
    scope: ActionScope,
    action: KvAction,
}

impl DssAction {
    /// Wrap a store action with a scope
    #[inline]
    #[must_use]
    pub fn new(scope: ActionScope, action: KvAction) -> Self {
        Self { scope, action }
    }

    /// Set a namespace key that must not exist
    pub fn add(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::add(key, value))
    }

    /// Set a resource key that must not exist
    pub fn add_resource(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionScope::Resource, KvAction::add(key, value))
    }

    /// Set a namespace key unconditionally
    pub fn update(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::update(key, value))
    }

    /// Set a resource key unconditionally
    pub fn update_resource(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ActionScope::Resource, KvAction::update(key, value))
    }

    /// Compare-and-swap a namespace key
    pub fn swap(key: impl Into<String>, old_value: Option<&str>, new_value: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::swap(key, old_value, new_value))
    }

    /// Compare-and-swap a resource key
    pub fn swap_resource(
        key: impl Into<String>,
        old_value: Option<&str>,
        new_value: impl Into<String>,
    ) -> Self {
        Self::new(ActionScope::Resource, KvAction::swap(key, old_value, new_value))
    }

    /// Delete a namespace key
    pub fn delete(key: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::delete(key))
    }

    /// Delete a namespace key holding `old_value`
    pub fn delete_if(key: impl Into<String>, old_value: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::delete_if(key, old_value))
    }

    /// Delete a resource key
    pub fn delete_resource(key: impl Into<String>) -> Self {
        Self::new(ActionScope::Resource, KvAction::delete(key))
    }

    /// Delete all namespace keys under a prefix
    pub fn delete_prefix(prefix: impl Into<String>) -> Self {
        Self::new(ActionScope::Namespace, KvAction::delete_prefix(prefix))
    }

    /// Delete all resource keys under a prefix
    pub fn delete_resource_prefix(prefix: impl Into<String>) -> Self {
        Self::new(ActionScope::Resource, KvAction::delete_prefix(prefix))
    }

    /// Scope of this action
    #[inline]
    #[must_use]
    pub fn scope(&self) -> ActionScope {
        self.scope
    }

    /// Unprefixed store action
    #[inline]
    #[must_use]
    pub fn action(&self) -> &KvAction {
        &self.action
    }

    /// Produce the store action with the prefix for this action's scope
    #[must_use]
    pub fn resolve(&self, namespace_prefix: &str, resource_prefix: &str) -> KvAction {
        match self.scope {
            ActionScope::Namespace => self.action.prefixed(namespace_prefix),
            ActionScope::Resource => self.action.prefixed(resource_prefix),
        }
    }
}
