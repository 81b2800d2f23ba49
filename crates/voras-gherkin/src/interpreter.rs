//! Binding and execution
//!
//! Every step is resolved before anything runs. A feature with any
//! unregistered or ambiguous step does not run at all.
//!
//! Each scenario is one method; an outline is one method per example row,
//! with the row's columns set as variables. A [`StepError::Failed`] fails its
//! method and the next method runs. A [`StepError::Manager`] stops the
//! feature and the remaining methods are skipped.

use crate::error::{BindError, GherkinError, GherkinResult, StepError};
use crate::model::{Feature, Scenario};
use crate::registry::{GherkinManager, Resolution, Statement, StatementRegistry, StepContext};
use crate::variables::Variables;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodStatus {
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed {
        /// Line of the failing step
        line: usize,
        /// Failure text
        reason: String,
    },
    /// Not run because of an earlier full stop
    Skipped,
}

impl fmt::Display for MethodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed { line, reason } => write!(f, "failed at line {line}: {reason}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Result of one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResult {
    /// Method name
    pub name: String,
    /// Outcome
    pub status: MethodStatus,
}

impl MethodResult {
    /// True if passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == MethodStatus::Passed
    }
}

/// Result of a whole feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureResult {
    /// Feature name
    pub name: String,
    /// One entry per method, in run order
    pub methods: Vec<MethodResult>,
    /// Manager error that stopped the run, if any
    pub full_stop: Option<String>,
    /// Final verdict
    pub passed: bool,
    /// Manager that replaced the computed verdict, if any
    pub overridden_by: Option<String>,
}

/// One runnable method with its statements bound
#[derive(Debug)]
pub struct GherkinMethod<'a> {
    /// Display name; outline rows are suffixed with `[row N]`
    pub name: String,
    /// Source scenario
    pub scenario: &'a Scenario,
    /// Example row for outline invocations
    pub row: Option<IndexMap<String, String>>,
    statements: Vec<&'a Statement>,
}

/// A feature whose every step resolved to one statement
#[derive(Debug)]
pub struct GherkinTest<'a> {
    /// Source feature
    pub feature: &'a Feature,
    /// Methods in run order
    pub methods: Vec<GherkinMethod<'a>>,
}

/// Statement registry plus the managers that filled it
pub struct GherkinInterpreter {
    managers: Vec<Arc<dyn GherkinManager>>,
    registry: StatementRegistry,
}

impl fmt::Debug for GherkinInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GherkinInterpreter")
            .field("managers", &self.managers.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("statements", &self.registry.len())
            .finish()
    }
}

impl GherkinInterpreter {
    /// Collect statements from every manager
    ///
    /// # Errors
    /// `GherkinError::Pattern` for a pattern that does not compile
    pub fn new(managers: Vec<Arc<dyn GherkinManager>>) -> GherkinResult<Self> {
        let mut registry = StatementRegistry::new();
        for manager in &managers {
            manager.register_statements(&mut registry)?;
            debug!(manager = manager.name(), "registered statements");
        }
        Ok(Self { managers, registry })
    }

    /// Statement registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StatementRegistry {
        &self.registry
    }

    /// Resolve every step of `feature`
    ///
    /// # Errors
    /// `BindError` listing every unregistered and ambiguous step
    pub fn bind<'a>(&'a self, feature: &'a Feature) -> Result<GherkinTest<'a>, BindError> {
        let mut unresolved = Vec::new();
        let mut ambiguous = Vec::new();
        let mut bound: Vec<(&Scenario, Vec<&Statement>)> = Vec::new();

        for scenario in &feature.scenarios {
            let mut statements = Vec::with_capacity(scenario.steps.len());
            for step in &scenario.steps {
                match self.registry.resolve(step) {
                    Resolution::Unique(stmt) => statements.push(stmt),
                    Resolution::Unmatched => unresolved.push(format!("line {}: {step}", step.line)),
                    Resolution::Ambiguous(hits) => {
                        let owners: Vec<&str> = hits.iter().map(|s| s.manager()).collect();
                        ambiguous.push(format!("line {}: {step} ({})", step.line, owners.join(", ")));
                    }
                }
            }
            bound.push((scenario, statements));
        }

        if !unresolved.is_empty() || !ambiguous.is_empty() {
            return Err(BindError {
                unresolved,
                ambiguous,
            });
        }

        let mut methods = Vec::new();
        for (scenario, statements) in bound {
            match &scenario.examples {
                None => methods.push(GherkinMethod {
                    name: scenario.name.clone(),
                    scenario,
                    row: None,
                    statements,
                }),
                Some(table) => {
                    for (index, row) in table.row_maps().into_iter().enumerate() {
                        methods.push(GherkinMethod {
                            name: format!("{} [row {}]", scenario.name, index + 1),
                            scenario,
                            row: Some(row),
                            statements: statements.clone(),
                        });
                    }
                }
            }
        }
        Ok(GherkinTest { feature, methods })
    }

    /// Run a bound feature
    ///
    /// Each method starts from a copy of `base`.
    #[must_use]
    pub fn run(&self, test: &GherkinTest<'_>, base: &Variables) -> FeatureResult {
        let mut methods = Vec::with_capacity(test.methods.len());
        let mut full_stop = None;

        for method in &test.methods {
            if full_stop.is_some() {
                methods.push(MethodResult {
                    name: method.name.clone(),
                    status: MethodStatus::Skipped,
                });
                continue;
            }
            let status = match run_method(method, base) {
                Ok(status) => status,
                Err((line, e)) => {
                    error!(feature = %test.feature.name, method = %method.name, line, error = %e, "full stop");
                    full_stop = Some(e.to_string());
                    MethodStatus::Failed {
                        line,
                        reason: e.to_string(),
                    }
                }
            };
            info!(feature = %test.feature.name, method = %method.name, result = %status, "method finished");
            methods.push(MethodResult {
                name: method.name.clone(),
                status,
            });
        }

        let computed = full_stop.is_none() && methods.iter().all(MethodResult::passed);
        let mut result = FeatureResult {
            name: test.feature.name.clone(),
            methods,
            full_stop,
            passed: computed,
            overridden_by: None,
        };

        for manager in &self.managers {
            if let Some(verdict) = manager.override_result(&result) {
                info!(manager = manager.name(), computed, verdict, "feature result overridden");
                result.passed = verdict;
                result.overridden_by = Some(manager.name().to_string());
                break;
            }
        }

        info!(feature = %result.name, passed = result.passed, "feature finished");
        result
    }

    /// Bind then run
    ///
    /// # Errors
    /// `GherkinError::Bind` if any step does not resolve
    pub fn run_feature(&self, feature: &Feature, base: &Variables) -> GherkinResult<FeatureResult> {
        let test = self.bind(feature).map_err(GherkinError::from)?;
        Ok(self.run(&test, base))
    }
}

/// Run one method; `Err` carries a full stop with its line
fn run_method(method: &GherkinMethod<'_>, base: &Variables) -> Result<MethodStatus, (usize, StepError)> {
    let mut variables = base.clone();
    if let Some(row) = &method.row {
        variables.extend(row.clone());
    }

    for (step, statement) in method.scenario.steps.iter().zip(&method.statements) {
        let captures = statement
            .captures(&step.text)
            .iter()
            .map(|c| variables.substitute(c))
            .collect();
        let mut ctx = StepContext {
            step,
            captures,
            variables: &mut variables,
        };
        match statement.execute(&mut ctx) {
            Ok(()) => debug!(line = step.line, step = %step, "step passed"),
            Err(e) if e.is_full_stop() => return Err((step.line, e)),
            Err(e) => {
                return Ok(MethodStatus::Failed {
                    line: step.line,
                    reason: e.to_string(),
                })
            }
        }
    }
    Ok(MethodStatus::Passed)
}
