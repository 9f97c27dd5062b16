//! Bounded retry policy for transient errors
//!
//! A transient failure is retried locally a fixed number of times with a
//! backoff between attempts. Once the budget is spent the caller escalates
//! to a fatal fault.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Retry budget for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u8,
    /// Wait before the first retry (ms)
    pub backoff_ms: u32,
    /// Backoff multiplier per further retry (1 = constant)
    pub backoff_factor: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 5_000,
            backoff_factor: 1,
        }
    }
}

impl RetryPolicy {
    /// Start tracking one operation under this policy
    pub fn tracker(&self) -> RetryTracker {
        RetryTracker {
            policy: self.clone(),
            failures: 0,
        }
    }

    /// Backoff before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u8) -> u32 {
        let exponent = u32::from(retry.saturating_sub(1));
        let factor = u32::from(self.backoff_factor.max(1)).saturating_pow(exponent);
        self.backoff_ms.saturating_mul(factor)
    }
}

/// Outcome of recording a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RetryDecision {
    /// Try again after this many milliseconds
    RetryAfter(u32),
    /// Attempts exhausted
    GiveUp,
}

/// Failure counter for one operation
#[derive(Debug, Clone)]
pub struct RetryTracker {
    policy: RetryPolicy,
    failures: u8,
}

impl RetryTracker {
    /// Record a failed attempt
    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.policy.backoff_for(self.failures))
        }
    }

    /// Record a successful attempt, restoring the full budget
    pub fn record_success(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures so far
    pub fn failures(&self) -> u8 {
        self.failures
    }
}
