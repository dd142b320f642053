//! Generic retry with bounded backoff.
//!
//! Callers describe which errors are worth retrying via [`RetryPolicy`]; the
//! backoff schedule and attempt budget live in [`RetryConfig`]. Used by the
//! calendar gateway for transient provider failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::warn;

/// Errors produced by [`retry_with_policy`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `source` is the last one.
    #[error("all {attempts} retry attempts exhausted")]
    AttemptsExhausted { attempts: u32, source: E },

    /// The operation failed with an error the policy refuses to retry.
    #[error("non-retryable error")]
    NonRetryable { source: E },
}

impl<E> RetryError<E> {
    /// The underlying operation error, whichever way the retry ended.
    pub fn into_source(self) -> E {
        match self {
            Self::AttemptsExhausted { source, .. } | Self::NonRetryable { source } => source,
        }
    }
}

/// Decision for a single failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff delay.
    Retry,
    /// Give up immediately.
    Stop,
}

/// Classifies errors as retryable or terminal.
pub trait RetryPolicy<E> {
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

impl<E, F> RetryPolicy<E> for F
where
    F: Fn(&E) -> bool,
{
    fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
        if self(error) {
            RetryDecision::Retry
        } else {
            RetryDecision::Stop
        }
    }
}

/// Backoff schedule between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^attempt`, capped.
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let millis = initial_delay.as_millis() as f64 * base.powi(attempt as i32);
                Duration::from_millis(millis.min(max_delay.as_millis() as f64) as u64)
            }
        }
    }
}

/// Attempt budget and backoff configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included. Must be at least 1.
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    /// Add up to 50% random jitter to each delay to avoid thundering herds.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(250),
                base: 2.0,
                max_delay: Duration::from_secs(5),
            },
            jitter: true,
        }
    }
}

impl RetryConfig {
    fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff.delay_for(attempt);
        if self.jitter && !delay.is_zero() {
            let extra = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2);
            delay + Duration::from_millis(extra)
        } else {
            delay
        }
    }
}

/// Run `operation` until it succeeds, the policy stops the retry, or the
/// attempt budget is exhausted.
pub async fn retry_with_policy<T, E, P, F, Fut>(
    config: &RetryConfig,
    policy: &P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    P: RetryPolicy<E>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    let source = loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    return Err(RetryError::NonRetryable { source: error });
                }
                RetryDecision::Retry => {
                    attempt += 1;
                    if attempt >= attempts {
                        break error;
                    }
                    let delay = config.delay_for(attempt - 1);
                    warn!(attempt, error = %error, ?delay, "attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
            },
        }
    };

    Err(RetryError::AttemptsExhausted { attempts, source })
}
