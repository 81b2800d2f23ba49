//! Feature runner
//!
//! Drives one feature through the run lifecycle:
//!
//! 1. parse, register managers and bind every step (nothing runs on failure)
//! 2. `queued -> allocated -> started -> running`
//! 3. execute
//! 4. write the result into the run view, `running -> finished`
//! 5. hand the result to the [`ResultSink`] and export the CPS access log
//!
//! A feature that fails to bind, or whose result cannot be written, moves its
//! run to `cancelled`.

use crate::core_manager::{CoreManager, TEST_NAMESPACE};
use crate::error::{FrameworkError, FrameworkResult};
use crate::framework::Framework;
use crate::lifecycle::RunStatus;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use voras_dss::{DssKeyAccess, DynamicRun, RetryBudget};
use voras_gherkin::{Feature, FeatureResult, GherkinError, GherkinInterpreter, GherkinManager, Variables};

/// Receiver of finished feature results
pub trait ResultSink: Send + Sync {
    /// Store or forward one result
    ///
    /// # Errors
    /// Sink-specific failures
    fn record(&self, run: &str, result: &FeatureResult) -> FrameworkResult<()>;
}

/// Sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn record(&self, run: &str, result: &FeatureResult) -> FrameworkResult<()> {
        for method in &result.methods {
            info!(run, feature = %result.name, method = %method.name, status = %method.status, "method result");
        }
        info!(run, feature = %result.name, passed = result.passed, "feature result");
        Ok(())
    }
}

/// Sink that keeps results in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<(String, FeatureResult)>>,
}

impl MemorySink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Recorded `(run, result)` pairs in arrival order
    #[must_use]
    pub fn results(&self) -> Vec<(String, FeatureResult)> {
        self.results.lock().clone()
    }
}

impl ResultSink for MemorySink {
    fn record(&self, run: &str, result: &FeatureResult) -> FrameworkResult<()> {
        self.results.lock().push((run.to_string(), result.clone()));
        Ok(())
    }
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Run name
    pub run_name: String,
    /// Feature result
    pub result: FeatureResult,
    /// Properties text of every CPS hit during the run
    pub access_log: String,
}

impl RunReport {
    /// JSON summary for tooling
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let methods: Vec<serde_json::Value> = self
            .result
            .methods
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "passed": m.passed(),
                    "status": m.status.to_string(),
                })
            })
            .collect();
        serde_json::json!({
            "run": self.run_name,
            "feature": self.result.name,
            "passed": self.result.passed,
            "fullStop": self.result.full_stop,
            "overriddenBy": self.result.overridden_by,
            "methods": methods,
        })
    }
}

/// Runs features against a framework
pub struct Runner {
    framework: Framework,
    managers: Vec<Arc<dyn GherkinManager>>,
    sink: Arc<dyn ResultSink>,
    budget: RetryBudget,
    variables: Variables,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("framework", &self.framework)
            .field("managers", &self.managers.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Runner with only the core manager and a logging sink
    #[must_use]
    pub fn new(framework: Framework) -> Self {
        Self {
            framework,
            managers: Vec::new(),
            sink: Arc::new(LogSink),
            budget: RetryBudget::default(),
            variables: Variables::new(),
        }
    }

    /// Add a manager after the core manager
    #[inline]
    #[must_use]
    pub fn with_manager(mut self, manager: Arc<dyn GherkinManager>) -> Self {
        self.managers.push(manager);
        self
    }

    /// Replace the result sink
    #[inline]
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Retry budget for status moves
    #[inline]
    #[must_use]
    pub fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Variables every method starts with
    #[inline]
    #[must_use]
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Framework in use
    #[inline]
    #[must_use]
    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    /// Read and run a feature file
    ///
    /// # Errors
    /// See [`run_source`](Self::run_source); also unreadable files
    pub fn run_file(&self, path: impl AsRef<Path>) -> FrameworkResult<RunReport> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GherkinError::io(path, e))?;
        self.run_source(&text)
    }

    /// Run feature text
    ///
    /// # Errors
    /// - `Gherkin` for parse, pattern or bind failures
    /// - lifecycle errors if the run is not freshly queued
    /// - store and sink failures
    pub fn run_source(&self, text: &str) -> FrameworkResult<RunReport> {
        let feature = Feature::parse(text).map_err(GherkinError::from)?;
        let run_name = self.framework.run_name().to_string();
        let lifecycle = self.framework.lifecycle()?;
        if !lifecycle.create()? {
            warn!(run = %run_name, "run already exists");
        }

        let interpreter = self.interpreter()?;
        let test = match interpreter.bind(&feature) {
            Ok(test) => test,
            Err(e) => {
                error!(run = %run_name, feature = %feature.name, error = %e, "feature did not bind");
                lifecycle.advance(RunStatus::Cancelled, &self.budget)?;
                return Err(GherkinError::from(e).into());
            }
        };

        for status in [RunStatus::Allocated, RunStatus::Started, RunStatus::Running] {
            lifecycle.advance(status, &self.budget)?;
        }
        let result = interpreter.run(&test, &self.variables);
        lifecycle.finish(&self.budget, |run| store_result(run, &result))?;

        self.sink.record(&run_name, &result)?;
        Ok(RunReport {
            run_name,
            result,
            access_log: self.framework.cps().access_log().export_properties(),
        })
    }

    fn interpreter(&self) -> FrameworkResult<GherkinInterpreter> {
        let core = CoreManager::new(self.framework.cps_namespace(TEST_NAMESPACE)?);
        let mut managers: Vec<Arc<dyn GherkinManager>> = vec![Arc::new(core)];
        managers.extend(self.managers.iter().cloned());
        GherkinInterpreter::new(managers).map_err(FrameworkError::from)
    }
}

/// Record the feature outcome in the run view
fn store_result(run: &DynamicRun, result: &FeatureResult) -> FrameworkResult<()> {
    let mut entries = BTreeMap::new();
    entries.insert("feature".to_string(), result.name.clone());
    entries.insert(
        "result".to_string(),
        if result.passed { "passed" } else { "failed" }.to_string(),
    );
    if let Some(reason) = &result.full_stop {
        entries.insert("fullstop".to_string(), reason.clone());
    }
    if let Some(manager) = &result.overridden_by {
        entries.insert("overridden.by".to_string(), manager.clone());
    }
    for (index, method) in result.methods.iter().enumerate() {
        entries.insert(format!("method.{index}.name"), method.name.clone());
        entries.insert(format!("method.{index}.status"), method.status.to_string());
    }
    Ok(run.put_all(&entries)?)
}
