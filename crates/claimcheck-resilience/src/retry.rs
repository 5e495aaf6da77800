//! Bounded retry with exponential backoff.
//!
//! Only rate-limited calls are retried. Every other provider error returns
//! after the first attempt so the gateway can move on to the fallback.

use claimcheck_core::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff parameters
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Sleep before the first retry
    pub base_delay: Duration,
    /// Cap on a single sleep
    pub max_delay: Duration,
    /// Growth factor between consecutive sleeps
    pub multiplier: f64,
    /// Random spread around each sleep, as a fraction of it (0.0 - 1.0)
    pub jitter: f64,
}

/// Runs a provider operation until it succeeds, fails permanently, or the
/// retry budget is spent
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Sleep before retry number `retry + 1`: `base × multiplier^retry`,
    /// capped, then jittered
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay = self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let delay = delay.min(self.config.max_delay.as_secs_f64());

        let spread = delay * self.config.jitter.clamp(0.0, 1.0);
        let delay = if spread > 0.0 {
            delay + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            delay
        };

        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Execute `operation`, sleeping between rate-limited attempts
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> RetryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retry: u32 = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(retries = retry, "Provider recovered after retry");
                    }
                    return RetryResult::Success {
                        value,
                        attempts: retry + 1,
                    };
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                return RetryResult::NonRetryable {
                    error,
                    attempts: retry + 1,
                };
            }
            if retry >= self.config.max_retries {
                return RetryResult::Exhausted {
                    error,
                    attempts: retry + 1,
                };
            }

            let delay = self.delay_for_attempt(retry);
            warn!(
                provider = %error.provider(),
                retry = retry + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

/// How a retried operation ended
#[derive(Debug)]
pub enum RetryResult<T> {
    /// An attempt succeeded
    Success {
        /// Value of the successful attempt
        value: T,
        /// Attempts made, including the first
        attempts: u32,
    },
    /// Still rate limited when the budget ran out
    Exhausted {
        /// Error of the last attempt
        error: ProviderError,
        /// Attempts made, including the first
        attempts: u32,
    },
    /// Failed with an error that is never retried
    NonRetryable {
        /// The error
        error: ProviderError,
        /// Attempts made, including the first
        attempts: u32,
    },
}

impl<T> RetryResult<T> {
    /// Attempts made, including the first
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. } => *attempts,
        }
    }
}
