//! Fixed-delay retry policy for fetch lifecycles.
//!
//! Every failed attempt (non-200 status, transport error, local write error)
//! is retryable; the only question is whether attempts remain. The wait
//! between attempts is constant.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use beatmap_fetch::download::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(30));
//! assert_eq!(
//!     policy.should_retry(1),
//!     RetryDecision::Retry { delay: Duration::from_secs(30), attempt: 2 }
//! );
//! assert!(matches!(policy.should_retry(3), RetryDecision::DoNotRetry { .. }));
//! ```

use std::time::Duration;

use tracing::debug;

/// Default maximum attempts per identifier (including the first).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default wait between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number comes next (1-indexed, so the first retry is attempt 2).
        attempt: u32,
    },

    /// Stop; the lifecycle is exhausted.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt budget and constant backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    /// Wait between consecutive attempts.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Returns the maximum number of attempts.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the fixed delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides what follows a failure of `attempt` (1-indexed).
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Per-identifier retry bookkeeping, owned by one fetch lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
    waited: Duration,
}

impl RetryState {
    /// Creates empty state (no attempts made yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an attempt has started.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Records time spent waiting before the next attempt.
    pub fn record_wait(&mut self, delay: Duration) {
        self.waited += delay;
    }

    /// Number of attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total backoff time spent so far.
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.waited
    }
}
