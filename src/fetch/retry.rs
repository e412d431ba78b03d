use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::FetchError;

/// Bounded exponential backoff.
///
/// `max_retries` is the total number of attempts. After failed attempt `n`
/// the controller waits `base_delay * 2^(n-1)` before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Wait after the 1-based failed `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Result of a fetch under retry. Only `Fetched` carries data; callers treat
/// anything else as "no data this cycle".
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { bytes: Bytes, attempts: u32 },
    Exhausted { attempts: u32, last_error: FetchError },
    Cancelled { attempts: u32 },
}

impl FetchOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Fetched { attempts, .. }
            | FetchOutcome::Exhausted { attempts, .. }
            | FetchOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched { .. })
    }

    /// The fetched body, or an empty buffer.
    pub fn into_bytes(self) -> Bytes {
        match self {
            FetchOutcome::Fetched { bytes, .. } => bytes,
            _ => Bytes::new(),
        }
    }
}

/// Runs `attempt_fn` until it succeeds, fails with a non-retryable error,
/// runs out of attempts, or `cancel` fires.
///
/// `attempt_fn` receives the 1-based attempt number. Cancellation interrupts
/// both an in-flight attempt and the backoff sleep.
pub async fn retry_with_backoff<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut attempt_fn: F,
) -> FetchOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Bytes, FetchError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return FetchOutcome::Cancelled { attempts: attempt };
        }
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FetchOutcome::Cancelled { attempts: attempt },
            result = attempt_fn(attempt) => result,
        };

        let err = match result {
            Ok(bytes) => {
                if attempt > 1 {
                    info!(attempt, bytes = bytes.len(), "Feed fetched after retry");
                }
                return FetchOutcome::Fetched {
                    bytes,
                    attempts: attempt,
                };
            }
            Err(err) => err,
        };

        if attempt >= max_attempts || !err.is_retryable() {
            error!(attempt, max_attempts, error = %err, "Feed fetch failed, giving up this cycle");
            return FetchOutcome::Exhausted {
                attempts: attempt,
                last_error: err,
            };
        }

        let delay = policy.delay_after(attempt);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Feed fetch failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return FetchOutcome::Cancelled { attempts: attempt },
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
