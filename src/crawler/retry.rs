//! Retry-with-backoff policy shared by listing fetches and file downloads
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Non-200 status | Retry up to `max_attempts`, backoff between attempts |
//! | Timeout | Retry up to `max_attempts`, backoff between attempts |
//! | Connection / stream error | Retry up to `max_attempts`, backoff between attempts |
//! | Filesystem error | Fail immediately |
//! | Cancellation | Stop before the next attempt |

use crate::config::{BackoffStrategy, RetryConfig};
use crate::MirrorError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounded retry policy with fixed or exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    strategy: BackoffStrategy,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Builds a policy from the `[retry]` configuration table
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff),
            strategy: config.strategy,
            max_backoff: Duration::from_millis(config.max_backoff),
        }
    }

    /// A policy that waits the same `backoff` before every retry
    pub fn fixed(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            strategy: BackoffStrategy::Fixed,
            max_backoff: backoff,
        }
    }

    /// Total attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given (1-based) attempt has failed
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed => self.backoff,
            BackoffStrategy::Exponential => {
                let shift = attempt.saturating_sub(1).min(16);
                self.backoff
                    .saturating_mul(1u32 << shift)
                    .min(self.max_backoff)
            }
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of attempts
    ///
    /// `op` receives the 1-based attempt number. Errors for which
    /// [`MirrorError::is_transient`] is false end the loop at once. After the
    /// last transient failure the error is wrapped in
    /// [`MirrorError::RetriesExhausted`]. Cancellation is honoured before each
    /// attempt and during backoff waits, never in the middle of `op`.
    ///
    /// # Arguments
    ///
    /// * `action` - Verb phrase used in log lines, e.g. "Downloading"
    /// * `url` - The URL being worked on, for logging and errors
    /// * `cancel` - Token that aborts the retry loop between attempts
    /// * `op` - The operation to attempt
    pub async fn run<T, F, Fut>(
        &self,
        action: &str,
        url: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, MirrorError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, MirrorError>>,
    {
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(MirrorError::Cancelled);
            }

            tracing::info!(
                "{}: {} (attempt {}/{})",
                action,
                url,
                attempt,
                self.max_attempts
            );

            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                return Err(MirrorError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let delay = self.delay_after(attempt);
            tracing::warn!(
                "Attempt {}/{} failed for {}: {}; retrying in {:?}",
                attempt,
                self.max_attempts,
                url,
                error,
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
