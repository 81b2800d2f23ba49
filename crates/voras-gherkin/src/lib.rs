//! Voras Gherkin
//!
//! Feature files describe tests as Given/When/Then steps. This crate turns
//! the text into a tree, the tree into a [`Feature`], and runs the feature's
//! scenarios by dispatching each step to the one manager statement that
//! matches it.
//!
//! # Overview
//!
//! - **lexer**: one token per meaningful line, with pushback
//! - **parser**: one function per grammar rule over an explicit token stack
//! - **model**: features, scenarios, steps and example tables
//! - **registry**: `(keyword, regex, handler)` statements from managers
//! - **interpreter**: pre-flight binding, outline expansion and execution
//!
//! # Example
//!
//! ```rust
//! use voras_gherkin::Feature;
//!
//! let feature = Feature::parse("Feature: F\nScenario: S\nGiven a thing\n").unwrap();
//! assert_eq!(feature.name, "F");
//! assert_eq!(feature.scenarios[0].steps[0].to_string(), "Given a thing");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod registry;
pub mod token;
pub mod variables;

// Re-exports
pub use error::{BindError, GherkinError, GherkinResult, ParseError, PatternError, StepError};
pub use interpreter::{
    FeatureResult, GherkinInterpreter, GherkinMethod, GherkinTest, MethodResult, MethodStatus,
};
pub use lexer::Lexer;
pub use model::{DataTable, Feature, Scenario, Step, StepKeyword};
pub use registry::{GherkinManager, Resolution, Statement, StatementRegistry, StepContext, StepHandler};
pub use token::{ParseToken, TokenType};
pub use variables::Variables;

/// Read and parse a feature file
///
/// # Errors
/// I/O or parse errors
pub fn parse_file(path: impl AsRef<std::path::Path>) -> GherkinResult<Feature> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| GherkinError::io(path, e))?;
    Ok(Feature::parse(&text)?)
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for feature authors and managers
    pub use crate::{
        Feature, FeatureResult, GherkinError, GherkinInterpreter, GherkinManager, GherkinResult,
        PatternError, StatementRegistry, StepContext, StepError, StepKeyword, Variables,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
