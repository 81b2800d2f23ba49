//! Voras Framework
//!
//! Wires the stores together for one process and runs features.
//!
//! # Overview
//!
//! - **bootstrap**: where the stores live, read from `bootstrap.properties`
//! - **framework**: the context object holding the opened stores
//! - **lifecycle**: run status moves by compare-and-swap in the DSS
//! - **core_manager**: built-in log, test property and assertion statements
//! - **runner**: parse, bind, run and record one feature
//! - **logging**: tracing subscriber setup for the binary
//!
//! # Example
//!
//! ```rust,no_run
//! use voras_framework::{BootstrapConfig, Framework, Runner};
//!
//! let config = BootstrapConfig::load("/home/tester/.voras").unwrap();
//! let framework = Framework::initialise(config).unwrap();
//! let report = Runner::new(framework).run_file("checks.feature").unwrap();
//! println!("passed: {}", report.result.passed);
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod core_manager;
pub mod error;
pub mod framework;
pub mod lifecycle;
pub mod logging;
pub mod runner;

// Re-exports
pub use bootstrap::{default_home, BootstrapConfig};
pub use core_manager::CoreManager;
pub use error::{FrameworkError, FrameworkResult};
pub use framework::Framework;
pub use lifecycle::{allowed_transitions, validate_transition, RunLifecycle, RunStatus};
pub use runner::{LogSink, MemorySink, ResultSink, RunReport, Runner};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the framework
    pub use crate::{
        BootstrapConfig, Framework, FrameworkError, FrameworkResult, ResultSink, RunLifecycle,
        RunReport, RunStatus, Runner,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
