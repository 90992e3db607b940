//! Retry executor with exponential backoff
//!
//! Drives a bounded number of attempts of an async operation. After failed
//! attempt `i` (0-indexed) it sleeps `base_backoff * 2^i` before attempt
//! `i + 1`. The sleep holds no lock, so a caller in backoff never blocks
//! other callers.

use crate::error::RetryExhausted;
use crate::metrics::MetricsRecorder;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (0 is treated as 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (0-indexed)
    ///
    /// `base_backoff * 2^attempt`, capped at `max_backoff`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_backoff.checked_mul(factor))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Attempt budget, never below one
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Successful outcome of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    /// Value returned by the successful attempt
    pub value: T,
    /// Retries taken before it (0 when the first attempt succeeded)
    pub retries: u32,
}

/// Runs operations under a [`RetryPolicy`], counting retries in the metrics
pub struct RetryExecutor {
    policy: RetryPolicy,
    metrics: Arc<MetricsRecorder>,
}

impl RetryExecutor {
    /// Create an executor reporting retries to `metrics`
    pub fn new(policy: RetryPolicy, metrics: Arc<MetricsRecorder>) -> Self {
        Self { policy, metrics }
    }

    /// The policy this executor follows
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds or the attempt budget is spent
    ///
    /// `operation` receives the 0-indexed attempt number. Each retry taken
    /// (every attempt after the first) increments `retries_attempted`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut operation: F,
    ) -> Result<Retried<T>, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.policy.attempts();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                self.metrics.record_retry();
            }

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt, "operation recovered after retry");
                    }
                    return Ok(Retried {
                        value,
                        retries: attempt,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "attempt failed"
                    );

                    if attempt + 1 >= attempts {
                        return Err(RetryExhausted {
                            attempts,
                            last_error: e,
                        });
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
