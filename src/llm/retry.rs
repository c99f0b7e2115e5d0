use crate::constants;
use std::time::Duration;

/// Exponential backoff schedule for transient provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub retry_limit: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_limit: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            retry_limit,
            base_delay,
            max_delay,
        }
    }

    /// Number of attempts a call gets. Never less than one.
    pub fn attempts(&self) -> u32 {
        self.retry_limit.max(1)
    }

    /// Wait between attempt `attempt` and `attempt + 1` (1-based):
    /// `min(base_delay * 2^(attempt - 1), max_delay)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_limit: constants::DEFAULT_RETRY_LIMIT,
            base_delay: Duration::from_millis(constants::DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(constants::DEFAULT_MAX_DELAY_MS),
        }
    }
}

/// Waits out a backoff delay. Swapped for a recording fake in tests.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
