// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry scheduling with exponential backoff.
//!
//! Backoff is keyed off the retry count of the oldest queued entry; entries
//! behind it inherit the same schedule. The scheduler never delivers
//! anything itself, it only decides when the engine should next try.

use std::time::Duration;

use tokio::time::Instant;

/// Default initial backoff delay.
pub const BASE_DELAY: Duration = Duration::from_secs(5);
/// Default backoff ceiling.
pub const MAX_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound on any delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: BASE_DELAY,
            max: MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt: `min(base * 2^retry_count, max)`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        // Cap the shift; the ceiling dominates long before 2^16.
        let factor = 1u32 << retry_count.min(16);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Arms at most one pending wake-up at a time.
///
/// Re-arming replaces the previous deadline, so duplicate concurrent
/// wake-ups cannot occur.
#[derive(Debug)]
pub struct RetryScheduler {
    policy: BackoffPolicy,
    deadline: Option<Instant>,
}

impl RetryScheduler {
    /// Creates a disarmed scheduler with the given policy.
    pub fn new(policy: BackoffPolicy) -> Self {
        RetryScheduler {
            policy,
            deadline: None,
        }
    }

    /// The backoff policy in effect.
    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    /// Arms a wake-up keyed off the oldest entry's retry count, replacing
    /// any previously armed deadline. Returns the computed delay.
    pub fn arm_for(&mut self, retry_count: u32) -> Duration {
        let delay = self.policy.delay_for(retry_count);
        self.deadline = Some(Instant::now() + delay);
        delay
    }

    /// Cancels the pending wake-up, if any.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Whether a wake-up is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves at the armed deadline. Pends forever while disarmed, so it
    /// can sit in a `select!` alongside other wake sources.
    pub async fn wait(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
