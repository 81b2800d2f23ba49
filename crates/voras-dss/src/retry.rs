//! Compare-and-swap retry loops
//!
//! Claims and state transitions are expressed as
//! `read → compute → swap → retry from read on failure`. Nothing in the store
//! is cancellable, so a timeout is a budget wrapped around the loop.

use crate::error::{DssError, DssResult};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasAttempt<T> {
    /// Swap succeeded
    Done(T),
    /// Swap lost a race; read again
    Retry,
    /// Caller no longer wants the update
    Abandon,
}

/// Attempt and time limits for a CAS loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum iterations
    pub max_attempts: u32,
    /// Optional wall-clock limit measured from the first attempt
    pub deadline: Option<Duration>,
    /// Sleep between lost races
    pub pause: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            deadline: None,
            pause: Duration::from_millis(20),
        }
    }
}

impl RetryBudget {
    /// Create default budget
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With maximum attempts
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// With wall-clock deadline
    #[inline]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// With pause between attempts
    #[inline]
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// Run `attempt` until it finishes, abandons, or the budget runs out
///
/// `attempt` receives the 1-based attempt number.
///
/// # Returns
/// `Some(value)` on success, `None` if abandoned
///
/// # Errors
/// - `DssError::RetryExhausted` when attempts or time run out
/// - any error returned by `attempt`
pub fn cas_retry<T, F>(budget: &RetryBudget, mut attempt: F) -> DssResult<Option<T>>
where
    F: FnMut(u32) -> DssResult<CasAttempt<T>>,
{
    let started = Instant::now();
    let mut tries = 0;

    while tries < budget.max_attempts {
        tries += 1;
        match attempt(tries)? {
            CasAttempt::Done(value) => return Ok(Some(value)),
            CasAttempt::Abandon => return Ok(None),
            CasAttempt::Retry => {
                debug!(attempt = tries, "compare-and-swap lost, retrying");
            }
        }
        if budget.deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        if tries < budget.max_attempts && !budget.pause.is_zero() {
            thread::sleep(budget.pause);
        }
    }

    warn!(attempts = tries, "compare-and-swap retry budget exhausted");
    Err(DssError::RetryExhausted { attempts: tries })
}
