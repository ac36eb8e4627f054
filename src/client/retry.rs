//! Retry with exponential backoff for mutating calls.
//!
//! Only errors that [`PaymentError::is_retryable`](crate::PaymentError::is_retryable) accepts are retried
//! (connection failures, timeouts, 5xx). Everything else returns immediately.

use crate::Result;
use std::future::Future;
use std::time::Duration;

/// Run `f` up to `max_retries + 1` times, doubling `base_delay` between attempts.
///
/// The closure receives the zero-based attempt number.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    base_delay: Duration,
    mut f: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    "{operation} failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
