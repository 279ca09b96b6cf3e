//! Bounded retry with exponential backoff.
//!
//! The configured `retry_attempts` is the number of retries after the first
//! attempt. Only errors reporting [`OAuthError::is_retryable`] are retried;
//! API-level rejections are returned on the first occurrence.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::oauth::OAuthError;

/// Retry behaviour for calls to the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_backoff: Duration,

    /// Upper bound for any single delay.
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,

    /// Randomise each delay within `[0, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Default backoff with the given number of retries.
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::with_retries(0)
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = Duration::from_millis(millis as u64).min(self.max_backoff);

        if self.jitter && !capped.is_zero() {
            let jittered = rand::thread_rng().gen_range(0..=capped.as_millis() as u64);
            Duration::from_millis(jittered)
        } else {
            capped
        }
    }

    /// Whether a failure on retry number `attempt` should be retried.
    pub fn should_retry(&self, attempt: u32, error: &OAuthError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Run `operation`, retrying retryable failures.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, OAuthError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OAuthError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {}",
                        error
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
