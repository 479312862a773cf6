//! Exponential backoff for remote calls
//!
//! Only transient [`ObjectStoreError`]s are retried. An expired upload
//! session is transient for the task but pointless to retry against the
//! same session URI, so it is returned immediately for the uploader to
//! open a new one.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seedup_core::config::UploadSettings;
use seedup_core::ports::ObjectStoreError;

/// Result of a retried call
#[derive(Debug)]
pub enum Retried<T> {
    Done(T),
    /// Cancellation arrived while waiting between attempts
    Cancelled,
}

/// Retry bound and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry` (1-based)
    ///
    /// `base * 2^(retry-1)`, raised to the server's `Retry-After` when
    /// that is longer, and capped at `max_delay`.
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let exp = retry.saturating_sub(1).min(20);
        let backoff = self.base_delay.saturating_mul(1u32 << exp);
        backoff.max(retry_after.unwrap_or_default()).min(self.max_delay)
    }

    /// Returns true if `err` is worth another attempt
    pub fn should_retry(err: &ObjectStoreError) -> bool {
        err.is_transient() && *err != ObjectStoreError::SessionExpired
    }

    /// Runs `f` until it succeeds, fails permanently, or exhausts the bound
    pub async fn run<F, Fut, T>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut f: F,
    ) -> Result<Retried<T>, ObjectStoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ObjectStoreError>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(Retried::Done(value));
                }
                Err(err) if attempt < self.max_attempts && Self::should_retry(&err) => {
                    let delay = self.delay_for(attempt, err.retry_after());
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(Retried::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl From<&UploadSettings> for RetryPolicy {
    fn from(settings: &UploadSettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.retry_base_delay,
            settings.max_retry_delay,
        )
    }
}
