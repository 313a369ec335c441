//! Retry policy with exponential backoff

use super::types::{CallFailure, FailureKind};
use crate::config::RetrySettings;
use async_trait::async_trait;
use std::time::Duration;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Wait, then try again
    Retry(Duration),
    /// Return the failure to the caller
    GiveUp,
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Base delay for timeouts, server errors and network errors
    pub backoff_base: Duration,

    /// Base delay for 429s that carry no usable `Retry-After`
    pub rate_limit_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            rate_limit_base: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy from config
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
            rate_limit_base: Duration::from_millis(settings.rate_limit_base_ms),
        }
    }

    /// Delay after a transient failure on `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(exp2(attempt))
    }

    /// Delay after a 429 on `attempt` when the server gave no hint
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_base.saturating_mul(exp2(attempt))
    }

    /// Longest wait a `Retry-After` hint may impose: the computed delay
    /// for the final attempt
    pub fn max_rate_limit_delay(&self) -> Duration {
        self.rate_limit_delay(self.max_attempts.saturating_sub(1))
    }

    /// Decide the follow-up to `failure` on `attempt` (0-based)
    pub fn decide(&self, attempt: u32, failure: &CallFailure) -> RetryAction {
        if !failure.kind.is_retryable() || attempt + 1 >= self.max_attempts {
            return RetryAction::GiveUp;
        }

        let delay = match failure.kind {
            FailureKind::RateLimited => match failure.retry_after {
                Some(hint) => hint.min(self.max_rate_limit_delay()),
                None => self.rate_limit_delay(attempt),
            },
            FailureKind::Timeout | FailureKind::ServerError | FailureKind::NetworkError => {
                self.backoff_delay(attempt)
            }
            FailureKind::Unauthorized
            | FailureKind::Forbidden
            | FailureKind::OtherHttp
            | FailureKind::Internal => return RetryAction::GiveUp,
        };

        RetryAction::Retry(delay)
    }
}

fn exp2(attempt: u32) -> u32 {
    1u32.checked_shl(attempt).unwrap_or(u32::MAX)
}

/// Where backoff waits happen; swapped out in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Suspends the current task on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
