//! Exponential backoff for rate-limited calls to the model service.
//!
//! Backoff state lives on the stack of each call, so concurrent callers
//! never share attempt counters.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::errors::{RateLimited, RetryError};

/// Retry budget for rate-limited operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rate-limited attempts allowed before giving up.
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Delay after the given failed attempt (attempts are numbered from 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }
}

/// Run `operation`, retrying rate-limited failures with exponential backoff.
///
/// Any other error is returned immediately as `RetryError::Operation`.
/// After `max_retries` consecutive rate-limited failures the call ends with
/// `RetryError::MaxRetriesExceeded` and no further attempt is made.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimited + std::error::Error + 'static,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                attempt += 1;
                if attempt >= policy.max_retries {
                    log::error!(
                        "[Retry] {}: giving up after {} rate-limited attempts",
                        label,
                        attempt
                    );
                    return Err(RetryError::MaxRetriesExceeded { attempts: attempt });
                }

                let delay = policy.delay_for_attempt(attempt);
                log::warn!(
                    "[Retry] {}: rate limited on attempt {}/{}, retrying in {:?}",
                    label,
                    attempt,
                    policy.max_retries,
                    delay
                );
                sleep(delay).await;
            }
            Err(e) => return Err(RetryError::Operation(e)),
        }
    }
}
