//! Retry logic with exponential backoff
//!
//! Upstream calls are retried only when [`StockError::is_retryable`] says a
//! later attempt may succeed. Callers that own a session reset it inside the
//! operation before handing an auth failure back, so each retry starts clean.

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Wait before the second attempt
    pub initial_backoff: Duration,

    /// Upper bound on any single wait
    pub max_backoff: Duration,

    /// Growth factor between consecutive waits
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(StockError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(StockError::ConfigError(
                "initial_backoff must not exceed max_backoff".to_string(),
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(StockError::ConfigError(
                "backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Wait before retry number `retry` (1-based)
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let backoff = self
            .initial_backoff
            .mul_f64(self.backoff_multiplier.powi(exponent).min(1e6));

        backoff.min(self.max_backoff)
    }

    /// Execute an async operation with retry logic
    ///
    /// Returns the first success, the first non-retryable error, or the last
    /// error once `max_attempts` is exhausted.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(operation = operation_name, attempt, attempts, "Attempting");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            retries = attempt - 1,
                            "Succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!(operation = operation_name, error = %e, "Non-retryable failure");
                    return Err(e);
                }
                Err(e) if attempt >= attempts => {
                    warn!(
                        operation = operation_name,
                        attempts,
                        error = %e,
                        "Giving up after exhausting retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        attempts,
                        ?backoff,
                        error = %e,
                        "Retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
