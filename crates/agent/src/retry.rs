//! Retry with exponential backoff for model calls.
//!
//! Client errors (status in `[400, 500)` other than 429) fail immediately.
//! Everything else is retried up to `max_attempts` total attempts, waiting
//! `base_delay * 2^n` before retry `n + 1`. Backoff sleeps race the turn's
//! cancellation token.

use std::future::Future;
use std::time::Duration;

use orcas_core::error::ProviderError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&orcas_config::RetryConfig> for RetryPolicy {
    fn from(config: &orcas_config::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Error classification used by [`RetryExecutor`].
pub trait Retryable {
    /// Whether another attempt could succeed.
    fn is_retryable(&self) -> bool;

    /// A server-requested minimum wait, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        if let Some(status) = self.status_code() {
            if (400..500).contains(&status) && status != 429 {
                return false;
            }
        }
        !matches!(
            self,
            ProviderError::MalformedResponse { .. } | ProviderError::NotConfigured(_)
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

/// Outcome of a retried operation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(E),
}

/// Stateless retry driver; safe to share across concurrent turns.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `on_retry(attempt, &error, delay)` fires before each backoff sleep with
    /// the 1-based number of the attempt that just failed.
    pub async fn run<T, E, Op, Fut, OnRetry>(
        &self,
        cancel: &CancellationToken,
        mut on_retry: OnRetry,
        mut op: Op,
    ) -> Result<T, RetryError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::error::Error + 'static,
        OnRetry: FnMut(u32, &E, Duration),
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(attempt, error = %err, "Non-retryable error");
                return Err(RetryError::Failed(err));
            }

            if attempt >= max_attempts {
                warn!(attempt, error = %err, "Retries exhausted");
                return Err(RetryError::Failed(err));
            }

            let backoff = self.policy.delay_for(attempt);
            let delay = err.retry_after().map_or(backoff, |hint| hint.max(backoff));

            on_retry(attempt, &err, delay);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient error"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
