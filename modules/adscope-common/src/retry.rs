//! Retry with exponential backoff for external provider calls.
//!
//! Kept as a small higher-order operation so every call site shares one
//! backoff policy instead of hand-rolling retry loops inline.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff schedule: attempt `n` (0-based) waits
/// `initial_delay * backoff_multiplier^n` before retrying.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first. Total attempts = max_retries + 1.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier: 2.0,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

/// Run `op`, retrying every failure up to the policy's ceiling.
/// The final error is returned unchanged once the budget is exhausted.
pub async fn retry_with_backoff<T, E, Fut, F>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_backoff_if(policy, |_| true, op).await
}

/// Run `op`, retrying only errors the predicate classifies as transient.
/// Non-retryable errors abort immediately without consuming retry budget.
pub async fn retry_with_backoff_if<T, E, Fut, F, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !should_retry(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
