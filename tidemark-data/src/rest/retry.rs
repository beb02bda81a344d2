use crate::error::DataError;
use reqwest::StatusCode;
use std::{future::Future, time::Duration};
use tokio::time::sleep;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Multiplier applied after each failed attempt.
    pub multiplier: u32,
    /// Maximum number of retry attempts.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            multiplier: 2,
            max_retries: 3,
        }
    }
}

/// Execute a future-producing closure with exponential backoff retry.
///
/// The `should_retry` closure determines whether a given error is retriable.
/// Returns the first success, or the last error after all retries are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = policy.initial_backoff;

    for _ in 0..policy.max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if should_retry(&err) => {
                sleep(backoff).await;
                backoff = (backoff * policy.multiplier).min(policy.max_backoff);
            }
            Err(err) => return Err(err),
        }
    }

    // Final attempt after all retries.
    operation().await
}

/// Determine whether a [`DataError`] should be retried.
///
/// Retries transient transport failures (timeouts, failed connects) and the
/// upstream statuses Binance uses for throttling and server faults
/// (429, 418, 5xx). Client errors (bad request, invalid symbol, etc) are not
/// retried.
pub fn is_retriable_data_error(error: &DataError) -> bool {
    match error {
        DataError::Transport(err) => err.is_timeout() || err.is_connect(),
        DataError::UpstreamStatus { status, .. } => {
            status.is_server_error()
                || *status == StatusCode::TOO_MANY_REQUESTS
                || *status == StatusCode::IM_A_TEAPOT
        }
        _ => false,
    }
}
