//! Retry with exponential backoff.
//!
//! Wraps a single asynchronous operation. The first attempt runs immediately;
//! retry `n` (1-based) sleeps `retry_delay * 2^(n-1)` first. The executor holds
//! no state between calls.

use crate::{Error, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Predicate deciding whether a failure is worth another attempt.
pub type RetryCondition = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Default retry condition: retry only when no response arrived (network,
/// timeout) or the remote reported a server error.
pub fn default_retry_condition(err: &Error) -> bool {
    err.kind().map(|k| k.retryable()).unwrap_or(false)
}

/// Configuration for retry logic
#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound on a single backoff sleep. `None` means uncapped.
    pub max_delay: Option<Duration>,
    pub retry_condition: RetryCondition,
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("max_delay", &self.max_delay)
            .field("retry_condition", &"<fn>")
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_delay: None,
            retry_condition: Arc::new(default_retry_condition),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No retries at all: one attempt, errors surface immediately.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }

    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Arc::new(condition);
        self
    }
}

/// Per-call options threaded through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Non-idempotent calls are attempted exactly once.
    pub idempotent: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { idempotent: true }
    }
}

impl RequestOptions {
    pub fn non_idempotent() -> Self {
        Self { idempotent: false }
    }
}

/// Bounded retry loop around one logical operation.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self.config.retry_delay.as_millis() as u64;
        let factor = 1u64
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let delay = Duration::from_millis(base.saturating_mul(factor));
        match self.config.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(op, self.config.max_retries, None).await
    }

    pub async fn execute_with<T, F, Fut>(&self, op: F, options: &RequestOptions) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = if options.idempotent {
            self.config.max_retries
        } else {
            0
        };
        self.run(op, max_retries, None).await
    }

    /// Like [`execute`](Self::execute), but `token` aborts an in-flight attempt
    /// or a backoff sleep. Cancellation is terminal and is never retried.
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        op: F,
        options: &RequestOptions,
        token: &CancellationToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = if options.idempotent {
            self.config.max_retries
        } else {
            0
        };
        self.run(op, max_retries, Some(token)).await
    }

    async fn run<T, F, Fut>(
        &self,
        mut op: F,
        max_retries: u32,
        token: Option<&CancellationToken>,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let outcome = match token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(Error::cancelled("retry")),
                        res = op() => res,
                    }
                }
                None => op().await,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.is_cancelled() || attempt >= max_retries || !(self.config.retry_condition)(&err)
            {
                return Err(err);
            }

            attempt += 1;
            let delay = self.backoff(attempt);
            debug!(
                attempt,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after failure"
            );

            match token {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(Error::cancelled("retry")),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }
}
