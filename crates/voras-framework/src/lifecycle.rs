//! Run lifecycle
//!
//! A run's status lives at `dss.framework.run.<run>.status`. Every move is a
//! compare-and-swap from the status the caller saw, so two processes cannot
//! both move the same run out of the same state.

use crate::error::{FrameworkError, FrameworkResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use voras_dss::{cas_retry, CasAttempt, DssKeyAccess, DynamicRun, RetryBudget};
use voras_kvstore::{WatchId, Watcher};

/// Key of the status value inside the run view
pub const STATUS_KEY: &str = "status";

/// State of one test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    /// Waiting for an engine
    Queued,
    /// Claimed by an engine
    Allocated,
    /// Engine is preparing the run
    Started,
    /// Feature is executing
    Running,
    /// Result recorded
    Finished,
    /// Abandoned before finishing
    Cancelled,
}

impl RunStatus {
    /// Every status
    pub const ALL: [Self; 6] = [
        Self::Queued,
        Self::Allocated,
        Self::Started,
        Self::Running,
        Self::Finished,
        Self::Cancelled,
    ];

    /// Stored form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Allocated => "allocated",
            Self::Started => "started",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// True for states with no way out
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| FrameworkError::UnknownStatus(s.to_string()))
    }
}

/// Statuses reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: RunStatus) -> Vec<RunStatus> {
    use RunStatus::{Allocated, Cancelled, Finished, Queued, Running, Started};
    match from {
        Queued => vec![Allocated, Cancelled],
        Allocated => vec![Started, Queued, Cancelled],
        Started => vec![Running, Cancelled],
        Running => vec![Finished, Cancelled],
        Finished | Cancelled => vec![],
    }
}

/// Check a move against the transition table
///
/// # Errors
/// `FrameworkError::IllegalTransition`
pub fn validate_transition(from: RunStatus, to: RunStatus) -> FrameworkResult<()> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(FrameworkError::IllegalTransition { from, to })
    }
}

fn allowed(from: RunStatus, to: RunStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Status operations on one run
#[derive(Debug, Clone)]
pub struct RunLifecycle {
    run: DynamicRun,
}

impl RunLifecycle {
    /// Wrap a run view
    #[must_use]
    pub fn new(run: DynamicRun) -> Self {
        Self { run }
    }

    /// Underlying run view
    #[must_use]
    pub fn run(&self) -> &DynamicRun {
        &self.run
    }

    /// Queue the run if it has no status yet
    ///
    /// Returns `false` if the run already exists.
    ///
    /// # Errors
    /// Store failures
    pub fn create(&self) -> FrameworkResult<bool> {
        let created = self
            .run
            .put_swap_with(STATUS_KEY, None, RunStatus::Queued.as_str(), &stamp(RunStatus::Queued))?;
        if created {
            info!(run = self.run.run_name(), status = %RunStatus::Queued, "run created");
        }
        Ok(created)
    }

    /// Current status, `None` for an unknown run
    ///
    /// # Errors
    /// Store failures or an unrecognised stored value
    pub fn status(&self) -> FrameworkResult<Option<RunStatus>> {
        self.run
            .get(STATUS_KEY)?
            .map(|s| s.parse())
            .transpose()
    }

    /// Move `from -> to` if the run is still in `from`
    ///
    /// # Errors
    /// - `IllegalTransition` if the move is not in the table
    /// - `StatusConflict` if the run is no longer in `from`
    pub fn transition(&self, from: RunStatus, to: RunStatus) -> FrameworkResult<()> {
        validate_transition(from, to)?;
        if self
            .run
            .put_swap_with(STATUS_KEY, Some(from.as_str()), to.as_str(), &stamp(to))?
        {
            info!(run = self.run.run_name(), %from, %to, "run transition");
            return Ok(());
        }
        let found = self.run.get(STATUS_KEY)?;
        Err(FrameworkError::conflict(self.run.run_name(), from, found.as_deref()))
    }

    /// Move to `to` from whatever the current status is
    ///
    /// Re-reads and retries when another writer moves the run in between.
    /// Returns the status that was replaced.
    ///
    /// # Errors
    /// - `IllegalTransition` if the current status cannot reach `to`
    /// - `UnknownStatus` if the run has no or an unrecognised status
    /// - `Dss(RetryExhausted)` if the budget runs out
    pub fn advance(&self, to: RunStatus, budget: &RetryBudget) -> FrameworkResult<RunStatus> {
        let mut refusal = None;
        let replaced = cas_retry(budget, |_| {
            let current = self.run.get(STATUS_KEY)?;
            let from = match current.as_deref().map(str::parse::<RunStatus>) {
                Some(Ok(from)) => from,
                Some(Err(e)) => {
                    refusal = Some(e);
                    return Ok(CasAttempt::Abandon);
                }
                None => {
                    refusal = Some(FrameworkError::UnknownStatus("<absent>".to_string()));
                    return Ok(CasAttempt::Abandon);
                }
            };
            if let Err(e) = validate_transition(from, to) {
                refusal = Some(e);
                return Ok(CasAttempt::Abandon);
            }
            if self
                .run
                .put_swap_with(STATUS_KEY, Some(from.as_str()), to.as_str(), &stamp(to))?
            {
                Ok(CasAttempt::Done(from))
            } else {
                Ok(CasAttempt::Retry)
            }
        })?;

        match (replaced, refusal) {
            (Some(from), _) => {
                info!(run = self.run.run_name(), %from, %to, "run transition");
                Ok(from)
            }
            (None, Some(e)) => Err(e),
            (None, None) => Err(FrameworkError::UnknownStatus("<absent>".to_string())),
        }
    }

    /// Write the outcome of a running run, then close it
    ///
    /// `write` gets the run view. On success the run moves to `finished`;
    /// if `write` fails the run moves to `cancelled` and the write error is
    /// returned.
    ///
    /// # Errors
    /// The `write` error, or any [`advance`](Self::advance) error
    pub fn finish<F>(&self, budget: &RetryBudget, write: F) -> FrameworkResult<RunStatus>
    where
        F: FnOnce(&DynamicRun) -> FrameworkResult<()>,
    {
        if let Err(e) = write(&self.run) {
            error!(run = self.run.run_name(), error = %e, "run outcome not written");
            if let Err(cancel) = self.advance(RunStatus::Cancelled, budget) {
                error!(run = self.run.run_name(), error = %cancel, "run not cancelled");
            }
            return Err(e);
        }
        self.advance(RunStatus::Finished, budget)
    }

    /// Watch status changes; the watcher sees the key `status`
    pub fn watch_status(&self, watcher: Arc<dyn Watcher>) -> WatchId {
        self.run.watch(watcher, STATUS_KEY)
    }

    /// Stop watching
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.run.unwatch(id)
    }
}

/// Timestamp written alongside a status change
fn stamp(status: RunStatus) -> BTreeMap<String, String> {
    BTreeMap::from([(format!("{status}.time"), Utc::now().to_rfc3339())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use voras_test_utils::{temp_store, RecordingWatcher};

    fn lifecycle() -> (tempfile::TempDir, RunLifecycle) {
        let (dir, store) = temp_store();
        let run = DynamicRun::new(store, "U1").unwrap();
        (dir, RunLifecycle::new(run))
    }

    #[test]
    fn table_matches_lifecycle_order() {
        assert!(validate_transition(RunStatus::Queued, RunStatus::Allocated).is_ok());
        assert!(validate_transition(RunStatus::Running, RunStatus::Finished).is_ok());
        assert!(validate_transition(RunStatus::Queued, RunStatus::Running).is_err());
        assert!(RunStatus::Finished.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        for status in RunStatus::ALL {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
            if !status.is_terminal() {
                assert!(validate_transition(status, RunStatus::Cancelled).is_ok());
            }
        }
    }

    #[test]
    fn create_once() {
        let (_dir, life) = lifecycle();
        assert!(life.create().unwrap());
        assert!(!life.create().unwrap());
        assert_eq!(life.status().unwrap(), Some(RunStatus::Queued));
        assert!(life.run().get("queued.time").unwrap().is_some());
    }

    #[test]
    fn stale_transition_is_a_conflict() {
        let (_dir, life) = lifecycle();
        life.create().unwrap();
        life.transition(RunStatus::Queued, RunStatus::Allocated).unwrap();

        let err = life
            .transition(RunStatus::Queued, RunStatus::Allocated)
            .unwrap_err();
        assert!(matches!(err, FrameworkError::StatusConflict { ref found, .. } if found == "allocated"));
    }

    #[test]
    fn advance_checks_the_table() {
        let (_dir, life) = lifecycle();
        life.create().unwrap();
        let budget = RetryBudget::new();

        assert_eq!(life.advance(RunStatus::Allocated, &budget).unwrap(), RunStatus::Queued);
        let err = life.advance(RunStatus::Finished, &budget).unwrap_err();
        assert!(matches!(err, FrameworkError::IllegalTransition { .. }));
        assert_eq!(life.status().unwrap(), Some(RunStatus::Allocated));
    }

    #[test]
    fn advance_unknown_run_fails() {
        let (_dir, life) = lifecycle();
        let err = life.advance(RunStatus::Allocated, &RetryBudget::new()).unwrap_err();
        assert!(matches!(err, FrameworkError::UnknownStatus(_)));
    }

    #[test]
    fn watchers_see_each_move() {
        let (_dir, life) = lifecycle();
        let watcher = RecordingWatcher::new();
        life.watch_status(watcher.clone());

        life.create().unwrap();
        life.transition(RunStatus::Queued, RunStatus::Cancelled).unwrap();

        assert_eq!(watcher.keys(), vec!["status", "status"]);
        let events = watcher.events();
        assert_eq!(events[1].new_value.as_deref(), Some("cancelled"));
    }
}
