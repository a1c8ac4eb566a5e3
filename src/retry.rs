//! Retry logic with exponential backoff
//!
//! A configurable retry driver for transient download failures: exponential
//! backoff with a delay cap and optional jitter. Errors decide their own
//! fate through [`IsRetryable`]; the driver never inspects error contents.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network resets, timeouts, upstream 5xx, suspect
/// content) should return `true`. Failures that no amount of retrying can
/// fix (bad input, cancellation) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Classification for the relay pipeline.
///
/// Everything that can happen inside a download attempt is treated as
/// retryable, including a content-type mismatch: from the outside it is
/// indistinguishable from a transient CDN glitch. Only failures decided
/// before or outside the attempt (validation, cancellation, shutdown,
/// upload, config) are final.
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Io(_) => true,
            Error::HttpStatus { .. } => true,
            Error::ContentMismatch { .. } => true,

            Error::Validation(_) => false,
            Error::Cancelled => false,
            Error::ShuttingDown => false,
            Error::Upload(_) => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
            Error::ApiServer(_) => false,
            // Already the terminal wrapper; never re-enter the loop
            Error::RetriesExhausted { .. } => false,
        }
    }
}

/// Run an async operation with exponential-backoff retries.
///
/// The operation is attempted up to `1 + max_retries` times. Between
/// attempts the driver sleeps for `initial_delay * backoff_multiplier^n`,
/// capped at `max_delay`, with optional jitter. A non-retryable error
/// aborts immediately; after the budget is spent the last error is
/// returned as-is (callers wrap it into their terminal error type).
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt: u32 = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt <= config.max_retries => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = config.max_attempts(),
                    delay_ms = delay.as_millis(),
                    "attempt failed, backing off"
                );

                let sleep_for = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(sleep_for).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                    .min(config.max_delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(error = %e, attempts = attempt, "attempt budget exhausted");
                } else {
                    tracing::error!(error = %e, "non-retryable failure");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd.
///
/// Uniformly distributed between 0% and 100% of the delay, so the result
/// lies in `[delay, 2 * delay]`.
fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
