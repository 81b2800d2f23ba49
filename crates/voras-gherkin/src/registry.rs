//! Executable statements and the managers that provide them
//!
//! A statement is `(keyword, regex, handler)`. Patterns are anchored, so a
//! step matches only when the whole text after the keyword matches.

use crate::error::{PatternError, StepError};
use crate::interpreter::FeatureResult;
use crate::model::{Step, StepKeyword};
use crate::variables::Variables;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// What a handler sees when its step runs
#[derive(Debug)]
pub struct StepContext<'a> {
    /// The step being run
    pub step: &'a Step,
    /// Capture groups from the statement pattern, placeholders substituted
    pub captures: Vec<String>,
    /// Variables of the current invocation
    pub variables: &'a mut Variables,
}

impl StepContext<'_> {
    /// Capture group by 0-based index
    ///
    /// # Errors
    /// `StepError::Manager` if the pattern has no such group
    pub fn capture(&self, index: usize) -> Result<&str, StepError> {
        self.captures
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| StepError::manager(format!("statement has no capture group {index}")))
    }
}

/// Code run for a matched step
pub trait StepHandler: Send + Sync {
    /// Run the step
    ///
    /// # Errors
    /// `StepError::Failed` to fail the scenario, `StepError::Manager` to stop
    /// the feature
    fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;
}

impl<F> StepHandler for F
where
    F: Fn(&mut StepContext<'_>) -> Result<(), StepError> + Send + Sync,
{
    fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        self(ctx)
    }
}

/// A provider of executable statements
pub trait GherkinManager: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Add this manager's statements
    ///
    /// # Errors
    /// A pattern that does not compile
    fn register_statements(&self, registry: &mut StatementRegistry) -> Result<(), PatternError>;

    /// Replace the computed feature result
    fn override_result(&self, _result: &FeatureResult) -> Option<bool> {
        None
    }
}

/// One registered statement
#[derive(Clone)]
pub struct Statement {
    manager: String,
    keyword: StepKeyword,
    pattern: Regex,
    handler: Arc<dyn StepHandler>,
}

impl Statement {
    /// Registering manager
    #[must_use]
    pub fn manager(&self) -> &str {
        &self.manager
    }

    /// Keyword the statement answers to
    #[must_use]
    pub fn keyword(&self) -> StepKeyword {
        self.keyword
    }

    /// Anchored pattern
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// True if `step` is this statement
    #[must_use]
    pub fn matches(&self, step: &Step) -> bool {
        self.keyword == step.keyword && self.pattern.is_match(&step.text)
    }

    /// Capture groups of `text`, unmatched groups as empty strings
    #[must_use]
    pub fn captures(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures(text)
            .map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run the handler
    ///
    /// # Errors
    /// Whatever the handler returns
    pub fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        self.handler.execute(ctx)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("manager", &self.manager)
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// How a step matched the registry
#[derive(Debug)]
pub enum Resolution<'r> {
    /// No statement matches
    Unmatched,
    /// Exactly one statement matches
    Unique(&'r Statement),
    /// Several statements match
    Ambiguous(Vec<&'r Statement>),
}

/// All statements known to an interpreter
#[derive(Debug, Default)]
pub struct StatementRegistry {
    statements: Vec<Statement>,
}

impl StatementRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statement; `pattern` is anchored at both ends
    ///
    /// # Errors
    /// `PatternError` if the pattern does not compile
    pub fn register(
        &mut self,
        manager: &str,
        keyword: StepKeyword,
        pattern: &str,
        handler: Arc<dyn StepHandler>,
    ) -> Result<(), PatternError> {
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PatternError {
            manager: manager.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        self.statements.push(Statement {
            manager: manager.to_string(),
            keyword,
            pattern: anchored,
            handler,
        });
        Ok(())
    }

    /// Register one pattern under several keywords
    ///
    /// # Errors
    /// `PatternError` if the pattern does not compile
    pub fn register_all(
        &mut self,
        manager: &str,
        keywords: &[StepKeyword],
        pattern: &str,
        handler: Arc<dyn StepHandler>,
    ) -> Result<(), PatternError> {
        for keyword in keywords {
            self.register(manager, *keyword, pattern, Arc::clone(&handler))?;
        }
        Ok(())
    }

    /// Match a step against every statement
    #[must_use]
    pub fn resolve(&self, step: &Step) -> Resolution<'_> {
        let mut hits: Vec<&Statement> = self.statements.iter().filter(|s| s.matches(step)).collect();
        match hits.len() {
            0 => Resolution::Unmatched,
            1 => Resolution::Unique(hits.remove(0)),
            _ => Resolution::Ambiguous(hits),
        }
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
