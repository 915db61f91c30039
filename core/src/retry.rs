//! Retry with exponential backoff
//!
//! Runs a fallible async operation up to a fixed number of times, doubling
//! the delay after every failed attempt. The delay wait races the caller's
//! [`Context`], so cancellation interrupts backoff but never an attempt that
//! is already running.

use crate::context::Context;
use crate::errors::RetryError;
use std::future::Future;
use std::time::Duration;

/// Bounded retry executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryExecutor {
    attempts: u32,
    initial_delay: Duration,
}

impl RetryExecutor {
    /// Create an executor performing at most `attempts` calls
    ///
    /// # Panics
    ///
    /// Panics if `attempts` is 0.
    pub fn new(attempts: u32, initial_delay: Duration) -> Self {
        assert!(attempts > 0, "Retry attempts must be greater than 0");
        Self {
            attempts,
            initial_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Run `work` until it succeeds, the attempts run out, or `ctx` is done
    ///
    /// Returns the first success, the cancellation cause if `ctx` fired
    /// before or between attempts, or the error of the final attempt.
    pub async fn run<T, E, F, Fut>(&self, ctx: &Context, mut work: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 0;

        loop {
            if let Some(cause) = ctx.err() {
                tracing::debug!(attempt, cause = %cause, "Retry aborted before attempt");
                return Err(RetryError::Cancelled(cause));
            }

            attempt += 1;
            let err = match work().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= self.attempts {
                tracing::debug!(attempts = attempt, "Retry attempts exhausted");
                return Err(RetryError::Operation(err));
            }

            tracing::debug!(
                attempt,
                remaining = self.attempts - attempt,
                "Operation failed, will retry"
            );
            tracing::trace!(delay = ?delay, "Waiting before retry");

            tokio::select! {
                biased;
                cause = ctx.done() => {
                    tracing::debug!(attempt, cause = %cause, "Retry aborted during backoff");
                    return Err(RetryError::Cancelled(cause));
                }
                _ = tokio::time::sleep(delay) => {
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Retry `work` up to `attempts` times, doubling `initial_delay` between tries
///
/// # Panics
///
/// Panics if `attempts` is 0.
///
/// # Example
///
/// ```rust
/// use failover_machines::{Context, retry};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = Context::new().with_timeout(Duration::from_secs(2));
/// let mut calls = 0;
///
/// let result = retry(&ctx, 5, Duration::from_millis(1), || {
///     calls += 1;
///     let outcome = if calls < 3 { Err("unavailable") } else { Ok(calls) };
///     async move { outcome }
/// })
/// .await;
///
/// assert_eq!(result.unwrap(), 3);
/// # }
/// ```
pub async fn retry<T, E, F, Fut>(
    ctx: &Context,
    attempts: u32,
    initial_delay: Duration,
    work: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryExecutor::new(attempts, initial_delay)
        .run(ctx, work)
        .await
}
