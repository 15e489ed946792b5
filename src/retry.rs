//! Retry policy for the remote reasoning call.
//!
//! The policy is a pure function from `(attempt, failure kind)` to a
//! decision, kept separate from the I/O call so it is unit-testable
//! without a network.
//!
//! # Policy
//!
//! - Up to [`MAX_RETRIES`] retries after the initial attempt.
//! - Generic transient failures and timeouts back off [`BASE_BACKOFF`].
//! - Service-unavailable failures back off [`UNAVAILABLE_BACKOFF`].
//! - Rate-limit/quota failures fail fast with no retry.

use std::time::Duration;

/// Maximum number of retries after the initial attempt.
pub const MAX_RETRIES: u32 = 2;

/// Backoff before retrying a generic transient failure.
pub const BASE_BACKOFF: Duration = Duration::from_millis(1500);

/// Backoff before retrying a service-unavailable failure.
pub const UNAVAILABLE_BACKOFF: Duration = Duration::from_millis(3000);

/// Classification of a failed reasoning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The call exceeded its hard deadline.
    Timeout,
    /// Quota exhausted (429). Fails fast.
    RateLimited,
    /// Transient 503-class outage. Retried with the longer backoff.
    Unavailable,
    /// Any other transport or provider failure.
    Other,
}

/// Outcome of consulting the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    Retry(Duration),
    /// Give up and surface the failure to the caller.
    Fail,
}

/// Attempt counts and backoff delays for the gateway.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Delay before retrying a generic failure.
    pub base_backoff: Duration,
    /// Delay before retrying a service-unavailable failure.
    pub unavailable_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_backoff: BASE_BACKOFF,
            unavailable_backoff: UNAVAILABLE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Decide whether a failed attempt should be retried.
    ///
    /// `attempt` is zero-based: the initial call is attempt 0, so a policy
    /// with `max_retries = 2` allows attempts 0, 1 and 2.
    pub fn decide(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if kind == FailureKind::RateLimited {
            return RetryDecision::Fail;
        }
        if attempt >= self.max_retries {
            return RetryDecision::Fail;
        }
        match kind {
            FailureKind::Unavailable => RetryDecision::Retry(self.unavailable_backoff),
            _ => RetryDecision::Retry(self.base_backoff),
        }
    }

    /// Retries remaining after the given zero-based attempt.
    pub fn remaining(&self, attempt: u32) -> u32 {
        self.max_retries.saturating_sub(attempt)
    }
}
