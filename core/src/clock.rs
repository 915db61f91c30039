//! Monotonic time sources for circuit breaker cooldowns
//!
//! This module provides different clock implementations:
//! - `MonotonicClock`: Real time anchored to an `Instant`, immune to NTP adjustments
//! - `ManualClock`: Time that only moves when told to, for tests and simulations

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic time for a circuit breaker
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Time elapsed since the clock's anchor
    fn now(&self) -> Duration;
}

/// Real monotonic clock (relative to clock creation)
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start_time: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Manually advanced clock
///
/// Starts at zero and only moves forward through [`ManualClock::advance`].
/// Share it with a breaker through an `Arc` to drive cooldowns deterministically.
///
/// # Example
///
/// ```rust
/// use failover_machines::{CircuitBreaker, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new());
/// let circuit = CircuitBreaker::builder("search")
///     .failure_threshold(1)
///     .open_timeout(Duration::from_secs(5))
///     .clock(clock.clone())
///     .build();
///
/// let _ = circuit.call(|| Err::<(), _>("timeout"));
/// assert!(circuit.is_open());
///
/// clock.advance(Duration::from_secs(6));
/// assert!(circuit.call(|| Ok::<_, &str>(())).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        // Saturate rather than wrap
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(by))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
