//! Voras Configuration Property Store
//!
//! Hierarchical, mostly-static configuration resolved through optional
//! qualifiers ("infixes") from most to least specific.
//!
//! # Overview
//!
//! - **ConfigurationPropertyStore**: backing store, overrides and access log
//!   for one run
//! - **ConfigurationPropertyService**: lookups within one namespace
//! - **OverridesLayer**: in-memory values checked before the store
//! - **AccessLog**: every lookup and where it was satisfied
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voras_cps::ConfigurationPropertyStore;
//! use voras_kvstore::KeyValueFile;
//!
//! let store = Arc::new(KeyValueFile::open("/tmp/cps.properties").unwrap());
//! let zos = ConfigurationPropertyStore::new(store).namespace("zos").unwrap();
//! let id = zos
//!     .get_property("image", "credentialid", &["PLEXMA", "MVMA"])
//!     .unwrap();
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod overrides;
pub mod record;
pub mod service;
pub mod variants;

// Re-exports
pub use backend::PropertyStore;
pub use error::{CpsError, CpsResult};
pub use overrides::OverridesLayer;
pub use record::{AccessLog, AccessRecord, AccessSource};
pub use service::{
    ConfigurationPropertyService, ConfigurationPropertyStore, NamespaceKind, REDACTED,
};
pub use variants::{property_variants, validate_infixes};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for property lookups
    pub use crate::{
        ConfigurationPropertyService, ConfigurationPropertyStore, CpsError, CpsResult,
        OverridesLayer, PropertyStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
