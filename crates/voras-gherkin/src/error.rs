//! Error types for Gherkin parsing and execution

use crate::token::TokenType;

/// Feature text does not follow the grammar
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A token appeared where the grammar does not allow it
    #[error("line {line}: unexpected {found} '{text}', expected {expected}")]
    UnexpectedToken {
        found: TokenType,
        text: String,
        line: usize,
        expected: String,
    },

    /// `Scenario Outline:` block reached its end without `Examples:`
    #[error("line {line}: Scenario Outline '{name}' has no Examples: section")]
    OutlineMissingExamples { name: String, line: usize },

    /// `Examples:` found after a plain scenario or outside any scenario
    #[error("line {line}: Examples: block is not inside a scenario outline")]
    ExamplesOutsideOutline { line: usize },

    /// `Examples:` with no header row
    #[error("line {line}: Examples: section has no data table")]
    EmptyDataTable { line: usize },

    /// Data row width differs from the header
    #[error("line {line}: data row has {found} column(s), header has {expected}")]
    RaggedDataRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Step line does not start with a known keyword
    #[error("line {line}: step '{text}' does not start with Given, When, Then or And")]
    UnknownKeyword { text: String, line: usize },
}

impl ParseError {
    /// Line the error refers to
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedToken { line, .. }
            | Self::OutlineMissingExamples { line, .. }
            | Self::ExamplesOutsideOutline { line }
            | Self::EmptyDataTable { line }
            | Self::RaggedDataRow { line, .. }
            | Self::UnknownKeyword { line, .. } => *line,
        }
    }
}

/// A statement pattern failed to compile
#[derive(Debug, thiserror::Error)]
#[error("manager '{manager}' registered invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    /// Registering manager
    pub manager: String,
    /// Pattern as given
    pub pattern: String,
    /// Compile error
    #[source]
    pub source: regex::Error,
}

/// Steps that did not resolve to exactly one statement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{} unregistered and {} ambiguous statement(s): {}",
    .unresolved.len(),
    .ambiguous.len(),
    summary(.unresolved, .ambiguous)
)]
pub struct BindError {
    /// Steps with no matching statement, as `line N: text`
    pub unresolved: Vec<String>,
    /// Steps with several matches, as `line N: text (m1, m2)`
    pub ambiguous: Vec<String>,
}

fn summary(unresolved: &[String], ambiguous: &[String]) -> String {
    unresolved
        .iter()
        .chain(ambiguous)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised before a feature can run
#[derive(Debug, thiserror::Error)]
pub enum GherkinError {
    /// Feature text is malformed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A manager's statement pattern is invalid
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Pre-flight binding failed
    #[error("binding failed: {0}")]
    Bind(#[from] BindError),

    /// Feature file could not be read
    #[error("failed to read feature {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GherkinError {
    /// Create I/O error
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result alias for Gherkin operations
pub type GherkinResult<T> = Result<T, GherkinError>;

/// Failure reported by a step handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// The step's check did not hold; the method fails and the run continues
    #[error("step failed: {0}")]
    Failed(String),

    /// The manager itself broke; the whole feature stops
    #[error("manager error: {0}")]
    Manager(String),
}

impl StepError {
    /// Create ordinary failure
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Create manager failure
    pub fn manager(reason: impl Into<String>) -> Self {
        Self::Manager(reason.into())
    }

    /// True if this stops the whole feature
    #[inline]
    #[must_use]
    pub fn is_full_stop(&self) -> bool {
        matches!(self, Self::Manager(_))
    }
}
