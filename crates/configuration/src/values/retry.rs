//! Retry policy for calls to external services.

use std::future::Future;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How often, and how patiently, a failed call is attempted again.
///
/// The delay after attempt `n` is `min(maxBackoffMs, initialBackoffMs * 2^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound of any delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl RetrySettings {
    /// The policy for plan generation requests.
    pub fn llm_default() -> Self {
        RetrySettings {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
        }
    }

    /// The policy for OData requests.
    pub fn odata_default() -> Self {
        RetrySettings {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }

    /// The delay to wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }

    /// Run `operation` until it succeeds, fails with an error `is_retryable` rejects, or the
    /// attempts run out. The operation receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        is_retryable: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_retryable(&err) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
