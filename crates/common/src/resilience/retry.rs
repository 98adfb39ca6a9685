//! Generic retry strategy with a constant delay and pluggable retry policies
//!
//! This module provides a retry mechanism for any fallible async operation.
//! Between attempts it sleeps a fixed delay; which errors deserve another
//! attempt is decided by a [`RetryPolicy`]. Execution can be aborted at any
//! point through a [`CancellationToken`], including while sleeping between
//! attempts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of attempts (initial try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between two attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Errors that can occur during retry operations
///
/// Every variant keeps the error produced by the final attempt so callers can
/// surface it unchanged.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All retry attempts have been exhausted
    #[error("All retry attempts exhausted after {attempts} tries: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The operation failed with an error the policy refused to retry
    #[error("Operation failed with non-retryable error: {source}")]
    NonRetryable { attempts: u32, source: E },

    /// The cancellation token fired before the operation could succeed
    #[error("Retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32, last_error: Option<E> },
}

impl<E> RetryError<E> {
    /// Number of attempts that were started before the executor gave up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Whether the executor stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Consume the error and return the last error produced by the operation.
    ///
    /// Returns `None` only when cancellation happened before the first
    /// attempt completed.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
    pub first_attempt_time: Instant,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Get the total elapsed time from first attempt to completion.
    pub fn total_elapsed(&self) -> Duration {
        self.first_attempt_time.elapsed()
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after `attempt` (1-based) failed with `error`.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

impl<E, P> RetryPolicy<E> for Arc<P>
where
    P: RetryPolicy<E> + ?Sized,
{
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
        (**self).should_retry(error, attempt)
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation after the configured delay
    Retry,
    /// Retry the operation after a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, initial try included. Zero behaves as one.
    pub max_attempts: u32,
    /// Constant pause between two attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: DEFAULT_DELAY }
    }
}

impl RetryConfig {
    /// Constant-delay configuration.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Attempts actually performed: never less than one.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Create with default configuration
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(&CancellationToken::new(), operation).await.into_result()
    }

    /// Execute an operation with retry logic, aborting when `cancel` fires.
    pub async fn execute_with_cancellation<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(cancel, operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.effective_attempts();
        let first_attempt_time = Instant::now();
        let mut total_delay = Duration::ZERO;
        let mut attempt: u32 = 0;
        let mut last_error: Option<E> = None;

        let finish = |result: RetryResult<T, E>, attempts: u32, total_delay: Duration| {
            RetryOutcome { result, attempts, total_delay, first_attempt_time }
        };

        loop {
            if cancel.is_cancelled() {
                debug!(attempts = attempt, "retry loop cancelled before next attempt");
                return finish(
                    Err(RetryError::Cancelled { attempts: attempt, last_error }),
                    attempt,
                    total_delay,
                );
            }

            attempt += 1;
            debug!(attempt, max_attempts, "executing operation");

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempts = attempt, "operation succeeded after retries");
                    }
                    return finish(Ok(value), attempt, total_delay);
                }
                Err(error) => error,
            };

            if cancel.is_cancelled() {
                debug!(attempts = attempt, error = ?error, "retry loop cancelled");
                return finish(
                    Err(RetryError::Cancelled { attempts: attempt, last_error: Some(error) }),
                    attempt,
                    total_delay,
                );
            }

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = ?error, "all retry attempts exhausted");
                return finish(
                    Err(RetryError::Exhausted { attempts: attempt, source: error }),
                    attempt,
                    total_delay,
                );
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, error = ?error, "retry policy refused to retry");
                    return finish(
                        Err(RetryError::NonRetryable { attempts: attempt, source: error }),
                        attempt,
                        total_delay,
                    );
                }
                RetryDecision::Retry => self.config.delay,
                RetryDecision::RetryAfter(custom) => custom,
            };

            debug!(attempt, ?delay, error = ?error, "operation failed, retrying");
            last_error = Some(error);

            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(attempts = attempt, "retry loop cancelled while sleeping");
                        return finish(
                            Err(RetryError::Cancelled { attempts: attempt, last_error }),
                            attempt,
                            total_delay,
                        );
                    }
                    () = tokio::time::sleep(delay) => {}
                }
                total_delay += delay;
            }
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
