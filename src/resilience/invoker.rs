// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Classification-aware retry for destination calls.
//!
//! Every call to the downstream API goes through [`invoke`]. Failures are
//! classified by [`ApiError`]: rate limits wait for the server-provided
//! interval when present (else exponential backoff, doubling per attempt),
//! transient failures wait a fixed short interval, and everything else is
//! propagated immediately. Attempts are bounded - there is no infinite
//! retry loop hiding in a callback.
//!
//! # Example
//!
//! ```
//! use note_mirror::InvokerConfig;
//! use std::time::Duration;
//!
//! let config = InvokerConfig::default();
//! assert_eq!(config.max_attempts, 5);
//! assert_eq!(config.transient_delay, Duration::from_millis(1000));
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::destination::traits::ApiError;

/// Bounded retry configuration for the invoker.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Total attempts per call, including the first (default: 5).
    pub max_attempts: usize,
    /// Starting backoff for rate limits without a server interval.
    pub rate_limit_base: Duration,
    /// Backoff cap for rate limits.
    pub rate_limit_max: Duration,
    /// Fixed wait before retrying a transient failure.
    pub transient_delay: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_base: Duration::from_millis(500),
            rate_limit_max: Duration::from_secs(30),
            transient_delay: Duration::from_millis(1000),
        }
    }
}

impl InvokerConfig {
    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_base: Duration::from_millis(1),
            rate_limit_max: Duration::from_millis(10),
            transient_delay: Duration::from_millis(1),
        }
    }
}

/// Run `operation` with bounded, classification-aware retry.
///
/// Returns the last error once `max_attempts` is exhausted, or immediately
/// for non-retryable classes (`Permanent`, `NotFoundStale`, `AuthExpired`).
pub async fn invoke<F, Fut, T>(
    operation_name: &str,
    config: &InvokerConfig,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut backoff = config.rate_limit_base;
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!(
                        operation = operation_name,
                        attempts = attempts + 1,
                        "Destination call succeeded after retries"
                    );
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;

                if !err.is_retryable() || attempts >= config.max_attempts {
                    return Err(err);
                }

                let delay = match &err {
                    ApiError::RateLimited { retry_after } => {
                        let wait = retry_after.unwrap_or(backoff);
                        backoff = (backoff * 2).min(config.rate_limit_max);
                        wait
                    }
                    // is_retryable() admits only RateLimited and Transient
                    _ => config.transient_delay,
                };

                crate::metrics::record_retry(operation_name, err.class());
                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    max = config.max_attempts,
                    class = err.class(),
                    error = %err,
                    wait_ms = delay.as_millis() as u64,
                    "Destination call failed, retrying"
                );

                sleep(delay).await;
            }
        }
    }
}
