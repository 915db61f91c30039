//! Error types for circuit breaker and retry operations

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during circuit breaker operations
#[derive(Debug, Error)]
pub enum CircuitError<E = Box<dyn StdError + Send + Sync>> {
    /// Circuit is open, the call was rejected without running
    #[error("circuit '{circuit}' is open (retry after {retry_after:?})")]
    Open {
        circuit: String,
        /// Monotonic time at which the circuit last opened
        opened_at: Duration,
        /// Remaining cooldown before a trial call may be admitted
        retry_after: Duration,
    },
    /// The wrapped operation failed
    #[error("circuit execution failed: {0}")]
    Execution(E),
}

impl<E> CircuitError<E> {
    /// Whether the call was rejected by an open circuit
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// The operation's own error, if the operation ran and failed
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            CircuitError::Open { .. } => None,
        }
    }
}

/// Why a context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancellation {
    /// The context was cancelled explicitly
    #[error("context cancelled")]
    Cancelled,
    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned by the retry executor
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The context fired before the attempts were exhausted
    #[error("retry aborted: {0}")]
    Cancelled(#[source] Cancellation),
    /// Every attempt failed; carries the error from the final attempt
    #[error("{0}")]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled(_))
    }

    /// The cancellation cause, if the retry loop was aborted
    pub fn cancellation(&self) -> Option<Cancellation> {
        match self {
            RetryError::Cancelled(cause) => Some(*cause),
            RetryError::Operation(_) => None,
        }
    }

    /// The last operation error, if the attempts were exhausted
    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::Cancelled(_) => None,
        }
    }
}

/// Invalid circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failure_threshold must be greater than 0")]
    ZeroFailureThreshold,
    #[error("success_threshold must be greater than 0")]
    ZeroSuccessThreshold,
    #[error("jitter_factor must be within 0.0..=1.0 (got {0})")]
    InvalidJitter(f64),
}
