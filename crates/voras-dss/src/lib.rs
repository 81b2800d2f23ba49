//! Voras Dynamic Status Store
//!
//! Namespace-scoped coordination state shared between test runs and the
//! framework. Every view is a key prefix over one shared
//! [`voras_kvstore::KeyValueFile`].
//!
//! # Overview
//!
//! - **DynamicStatusStore**: keys under `dss.<namespace>.`
//! - **DynamicResource**: keys under `dss.framework.resource.<namespace>.<resource>.`
//! - **DynamicRun**: keys under `dss.framework.run.<run>.`
//! - **DssAction**: scoped units of an atomic batch
//! - **cas_retry**: read-compute-swap loops bounded by a [`RetryBudget`]
//! - **ResourcePool**: template expansion and reservation of resource strings
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voras_dss::prelude::*;
//! use voras_kvstore::KeyValueFile;
//!
//! let store = Arc::new(KeyValueFile::open("/tmp/dss.properties").unwrap());
//! let dss = DynamicStatusStore::new(store, "zos").unwrap();
//! dss.perform_actions(&[
//!     DssAction::swap("image.MV2C.slots", None, "1"),
//!     DssAction::add_resource("image.MV2C.slot.run1", "active"),
//! ])
//! .unwrap();
//! ```

#![warn(missing_docs)]

pub mod access;
pub mod action;
pub mod error;
pub mod pool;
pub mod retry;
pub mod service;

// Re-exports
pub use access::{DssKeyAccess, ScopedStore};
pub use action::{ActionScope, DssAction};
pub use error::{DssError, DssResult};
pub use pool::{expand_template, ResourcePool};
pub use retry::{cas_retry, CasAttempt, RetryBudget};
pub use service::{validate_namespace, DynamicResource, DynamicRun, DynamicStatusStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for DSS users
    pub use crate::{
        DssAction, DssError, DssKeyAccess, DssResult, DynamicResource, DynamicRun,
        DynamicStatusStore, RetryBudget,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
