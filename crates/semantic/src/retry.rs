//! Retry logic with linear backoff for rate-limited embedding calls.
//!
//! Only rate-limit signals are retried. Any other failure ends the loop on the
//! attempt that produced it.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::EmbedError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait after attempt `i` (1-indexed) is `i * backoff_unit`.
    #[serde(with = "crate::serde_millis")]
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Delay to wait after a failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }
}

/// Result of a retryable operation.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The final result (success or terminal error).
    pub result: Result<T, EmbedError>,
    /// Number of attempts made (1 = first try succeeded).
    pub attempts: u32,
    /// Backoff waits actually slept, in order.
    pub waits: Vec<Duration>,
    /// Total time spent, waits included.
    pub total_duration: Duration,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, EmbedError> {
        self.result
    }
}

/// Execute an async operation, backing off on rate-limit errors.
///
/// The operation receives the 1-indexed attempt number. When the final attempt
/// is still rate limited, the error becomes [`EmbedError::RateLimitExceeded`]
/// carrying `exhausted_message`; no further request is sent.
pub async fn execute_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    exhausted_message: &str,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, EmbedError>>,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut waits = Vec::new();

    for attempt in 1..=max_attempts {
        let err = match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    waits,
                    total_duration: start.elapsed(),
                };
            }
            Err(err) => err,
        };

        if !err.is_rate_limited() {
            return RetryOutcome {
                result: Err(err),
                attempts: attempt,
                waits,
                total_duration: start.elapsed(),
            };
        }

        if attempt == max_attempts {
            tracing::warn!(
                event = "embed_rate_limited",
                provider,
                attempts = attempt,
                error = %err,
                "retry budget exhausted"
            );
            break;
        }

        let delay = policy.delay_after(attempt);
        tracing::warn!(
            event = "embed_rate_limited",
            provider,
            attempt,
            backoff_ms = delay.as_millis() as u64,
            error = %err,
            "rate limited, backing off"
        );
        sleep(delay).await;
        waits.push(delay);
    }

    RetryOutcome {
        result: Err(EmbedError::RateLimitExceeded {
            provider: provider.to_string(),
            attempts: max_attempts,
            message: exhausted_message.to_string(),
        }),
        attempts: max_attempts,
        waits,
        total_duration: start.elapsed(),
    }
}
