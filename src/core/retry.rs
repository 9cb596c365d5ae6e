//! Retry policy with exponential backoff and jitter
//!
//! Network operations are retried with exponentially growing delays; a
//! jitter factor keeps parallel downloads from hammering the server in
//! lockstep. Errors that cannot succeed on retry (unavailable option,
//! missing folder, bad URL) fail immediately.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::core::models::{AppError, AppResult};

/// Retry behaviour for download and metadata operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomized in both directions (0.0 - 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy with the configured attempt count and default backoff
    pub fn from_attempts(attempts: usize) -> Self {
        Self {
            max_attempts: (attempts as u32).max(1),
            ..Default::default()
        }
    }

    /// Delay to sleep before retrying after the given zero-based attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential =
            self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter_factor > 0.0 {
            let jitter = rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor);
            (capped * (1.0 + jitter)).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }
}

/// Whether an error class can succeed on a later attempt
pub fn is_retryable(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Network(_) | AppError::Download(_) | AppError::Io(_) | AppError::Metadata(_)
    )
}

/// Run an operation under the retry policy.
///
/// The operation is called with the zero-based attempt number and must
/// produce a fresh future per attempt.
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt + 1 < policy.max_attempts && is_retryable(&error) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed ({}), retrying in {:.1}s",
                    attempt + 1,
                    policy.max_attempts,
                    error,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
