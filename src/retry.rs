//! Bounded retry loop for fallible async operations.
//!
//! Semantics:
//! - `max_retries` counts retries *after* the initial attempt, so an always-failing retryable
//!   operation runs `max_retries + 1` times.
//! - The `should_retry` predicate decides whether a failure is transient. Non-retryable failures
//!   return immediately without waiting.
//! - After failed attempt `i` (zero-based) the policy waits `backoff.delay(i)` through its
//!   [`Sleeper`] before trying again.
//! - A [`CancelToken`] is raced against both the operation and the wait. Cancellation stops the
//!   loop and is reported as [`RetryError::Cancelled`], never as an operation failure.
//!
//! ```rust
//! use std::time::Duration;
//! use charitygate::{Backoff, InstantSleeper, RetryPolicy, RetryError};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<std::io::Error>::builder()
//!     .max_retries(2)
//!     .backoff(Backoff::exponential(Duration::from_millis(100)))
//!     .with_sleeper(InstantSleeper)
//!     .build();
//! let result: Result<(), _> = policy
//!     .execute(|| async { Err(std::io::Error::other("down")) })
//!     .await;
//! assert!(matches!(result, Err(RetryError::Failed { attempts: 3, .. })));
//! # });
//! ```

use crate::{Backoff, CancelToken, Sleeper, TokioSleeper};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Why a retried operation did not produce a value.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The last failure, after `attempts` total attempts.
    Failed { attempts: usize, error: E },
    /// The token fired; `attempts` is how many attempts had completed.
    Cancelled { attempts: usize },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> usize {
        match self {
            Self::Failed { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}

/// Retry policy combining a retry bound, backoff, predicate and sleeper.
pub struct RetryPolicy<E> {
    max_retries: usize,
    backoff: Backoff,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            backoff: self.backoff,
            should_retry: self.should_retry.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("sleeper", &self.sleeper)
            .field("should_retry", &"<predicate>")
            .finish()
    }
}

impl<E> RetryPolicy<E>
where
    E: Send + 'static,
{
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    pub async fn execute<T, Fut, Op>(&self, operation: Op) -> Result<T, RetryError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut() -> Fut,
    {
        self.execute_with_cancel(&CancelToken::new(), operation).await
    }

    /// Like [`execute`](Self::execute), stopping as soon as `cancel` fires.
    pub async fn execute_with_cancel<T, Fut, Op>(
        &self,
        cancel: &CancelToken,
        mut operation: Op,
    ) -> Result<T, RetryError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        Op: FnMut() -> Fut,
    {
        let mut attempt = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: attempt }),
                outcome = operation() => outcome,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let completed = attempt + 1;
            if !(self.should_retry)(&error) || attempt >= self.max_retries {
                return Err(RetryError::Failed { attempts: completed, error });
            }

            let delay = self.backoff.delay(attempt);
            tracing::warn!(attempt = completed, delay_ms = delay.as_millis() as u64, "retrying");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: completed }),
                _ = self.sleeper.sleep(delay) => {}
            }
            attempt = completed;
        }
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<E> {
    max_retries: usize,
    backoff: Backoff,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> RetryPolicyBuilder<E> {
    /// Defaults: 3 retries, 1s exponential backoff, retry everything, tokio timer.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::exponential(Duration::from_secs(1)),
            should_retry: Arc::new(|_| true),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Retries after the initial attempt. Zero disables retrying.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Predicate deciding whether a failure is transient.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn with_shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> RetryPolicy<E> {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: self.backoff,
            should_retry: self.should_retry,
            sleeper: self.sleeper,
        }
    }
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
