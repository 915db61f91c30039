//! FailoverMachines - Retry with backoff and circuit breaking
//!
//! This crate provides two composable resilience primitives:
//! - A bounded retry executor with exponential backoff that honors a cancellable context
//! - A thread-safe circuit breaker (Closed → Open → HalfOpen) built on a state machine
//! - Monotonic time tracking to prevent NTP clock skew issues
//!
//! Neither depends on the other. Guard a retried operation with a breaker, or
//! retry a breaker-guarded call; the nesting is up to the caller.
//!
//! # Example
//!
//! ```rust
//! use failover_machines::{CircuitBreaker, Context, retry};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let circuit = CircuitBreaker::builder("inventory")
//!     .failure_threshold(5)
//!     .success_threshold(2)
//!     .open_timeout(Duration::from_secs(30))
//!     .on_open(|name| println!("Circuit {} opened!", name))
//!     .build();
//!
//! let ctx = Context::new().with_timeout(Duration::from_secs(5));
//!
//! // Retry a call that the breaker guards
//! let result = retry(&ctx, 3, Duration::from_millis(10), || async {
//!     circuit.call(|| Ok::<_, String>("in stock"))
//! })
//! .await;
//!
//! assert_eq!(result.unwrap(), "in stock");
//! assert!(circuit.is_closed());
//! # }
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod clock;
pub mod context;
pub mod errors;
pub mod retry;

pub use builder::CircuitBuilder;
pub use callbacks::{Callbacks, Transition};
pub use circuit::{CircuitBreaker, CircuitState, CircuitStats, Config};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use context::Context;
pub use errors::{Cancellation, CircuitError, ConfigError, RetryError};
pub use retry::{RetryExecutor, retry};
