//! Bounded retry policy for upstream completion calls.
//!
//! The policy is pure: it only decides what to do after an attempt and never sleeps or
//! performs I/O itself. `crate::proxy` drives the loop and does the waiting.

use http::StatusCode;
use std::time::Duration;

/// Statuses treated as transient upstream conditions.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// What happened on one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Status(StatusCode),
    /// No status was received (connection refused, DNS, timeout, ...).
    TransportError,
}

/// What the caller should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Success status; stop and parse the reply.
    Proceed,
    /// Transient failure with budget left; wait, then try again.
    RetryAfter(Duration),
    /// Terminal failure; surface it now.
    Abort,
    /// Transient failure on the last allowed attempt.
    Exhausted,
}

/// Fixed-delay (linear) retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    retry_on_transport_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            retry_on_transport_error: false,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retry_on_transport_error: false,
        }
    }

    /// Also retry network-level failures (off by default).
    pub fn with_transport_retries(mut self, enabled: bool) -> Self {
        self.retry_on_transport_error = enabled;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retries_transport_errors(&self) -> bool {
        self.retry_on_transport_error
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUSES.contains(&status.as_u16())
    }

    /// Delay before the attempt following `attempt`. Constant by design of this policy.
    pub fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Decide the next step after the 1-based `attempt` finished with `outcome`.
    pub fn decide(&self, attempt: u32, outcome: AttemptOutcome) -> RetryDecision {
        let transient = match outcome {
            AttemptOutcome::Status(status) if status.is_success() => return RetryDecision::Proceed,
            AttemptOutcome::Status(status) => Self::is_retryable_status(status),
            AttemptOutcome::TransportError => self.retry_on_transport_error,
        };
        if !transient {
            RetryDecision::Abort
        } else if attempt < self.max_attempts {
            RetryDecision::RetryAfter(self.delay_for(attempt))
        } else {
            RetryDecision::Exhausted
        }
    }
}
