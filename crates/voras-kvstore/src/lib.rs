//! Voras Key/Value Store
//!
//! The backing store shared by the configuration property store (CPS), the
//! dynamic status store (DSS) and the credentials store.
//!
//! # Overview
//!
//! - **KeyValueFile**: properties-file store with get/set/delete, prefix scan,
//!   compare-and-swap and atomic action batches
//! - **WatchTable**: `(pattern, callback)` subscriptions notified on every
//!   NEW/MODIFIED/DELETE of a matching key
//! - **properties**: the `key=value` text codec
//!
//! # Example
//!
//! ```rust,no_run
//! use voras_kvstore::KeyValueFile;
//!
//! let store = KeyValueFile::open("/tmp/dss.properties").unwrap();
//! assert!(store.set_atomic("dss.zos.lock", None, "run1").unwrap());
//! assert!(!store.set_atomic("dss.zos.lock", None, "run2").unwrap());
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod error;
pub mod properties;
pub mod store;
pub mod watch;

// Re-exports
pub use action::KvAction;
pub use error::{KvResult, KvStoreError, PropertiesError};
pub use store::KeyValueFile;
pub use watch::{Change, WatchEvent, WatchId, WatchPattern, WatchTable, Watcher};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store operations
    pub use crate::{KeyValueFile, KvAction, KvResult, KvStoreError, WatchEvent, WatchId, Watcher};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
