use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, warn};

use crate::types::error::is_transient_error;

/// Runs `operation` up to `max_retries` times with exponential backoff.
///
/// Only transient errors are retried. A non-transient error is returned
/// to the caller immediately, after a single invocation. The delay before
/// attempt `n + 1` is `base_delay * 2^(n - 1)`.
pub async fn retry<T, F, Fut>(
    operation_name: &str,
    operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = max_retries.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_transient_error(&e) {
                    return Err(e);
                }

                if attempt < attempts {
                    let delay = base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = attempts,
                        delay_milliseconds = delay.as_millis() as u64,
                        error = %e,
                        "transient error. retrying."
                    );

                    tokio::time::sleep(delay).await;
                }

                last_error = Some(e);
            }
        }
    }

    let e = last_error.unwrap_or_else(|| anyhow::anyhow!("retry budget exhausted."));
    error!(
        operation = operation_name,
        max_retries = attempts,
        error = %e,
        "all attempts failed."
    );

    Err(e)
}
