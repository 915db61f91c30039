//! Circuit breaker implementation using state machines
//!
//! The breaker keeps a single lock per instance. The lock covers the gating
//! decision before a call and the bookkeeping after it, never the call itself.

use crate::{
    callbacks::{Callbacks, Transition},
    clock::{Clock, MonotonicClock},
    errors::{CircuitError, ConfigError},
};
use state_machines::state_machine;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Consecutive failures in Closed required to open the circuit
    pub failure_threshold: u32,

    /// Consecutive successes in HalfOpen required to close the circuit
    pub success_threshold: u32,

    /// Time the circuit must stay Open before a trial call is admitted
    pub open_timeout: Duration,

    /// Jitter factor for open_timeout (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
            jitter_factor: 0.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::ZeroSuccessThreshold);
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitter(self.jitter_factor));
        }
        Ok(())
    }

    /// Cooldown for one Open period, with jitter applied
    fn cooldown(&self) -> Duration {
        if self.jitter_factor > 0.0 {
            let base_ms = u64::try_from(self.open_timeout.as_millis()).unwrap_or(u64::MAX);
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms: base_ms,
                multiplier: 1.0,
                max_delay_ms: base_ms,
            };
            Duration::from_millis(policy.calculate_delay(1, self.jitter_factor) as u64)
        } else {
            self.open_timeout
        }
    }
}

/// Observable state of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected until the cooldown elapses
    Open,
    /// Trial calls check whether the operation recovered
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }

    fn of(machine: &DynamicCircuit) -> Self {
        match machine.current_state() {
            "Open" => CircuitState::Open,
            "HalfOpen" => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit, taken under its lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitStats {
    pub state: CircuitState,
    /// Consecutive failures (Closed only, otherwise 0)
    pub failure_count: u32,
    /// Consecutive successes (HalfOpen only, otherwise 0)
    pub success_count: u32,
    /// When the circuit last opened (Open only)
    pub opened_at: Option<Duration>,
}

/// Circuit breaker context - shared data across all states
#[derive(Clone)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
    pub clock: Arc<dyn Clock>,
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            config: Config::default(),
            clock: Arc::new(MonotonicClock::new()),
        }
    }
}

impl fmt::Debug for CircuitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    pub opened_at: Duration,
    /// Cooldown drawn when the circuit opened, jitter included
    pub cooldown: Duration,
}

/// Data specific to the HalfOpen state
#[derive(Debug, Clone, Default)]
pub struct HalfOpenData {
    pub consecutive_successes: u32,
}

// Entering a state starts it with default data, which zeroes its counter.
// The initial state gets no data, so Closed keeps its streak in `Inner`.
state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen(HalfOpenData),
    ],
    events {
        trip {
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        attempt_reset {
            guards: [timeout_elapsed],
            transition: { from: Open, to: HalfOpen }
        }
        close {
            guards: [should_close],
            transition: { from: HalfOpen, to: Closed }
        }
    }
}

impl Circuit<HalfOpen> {
    /// Check if enough successes to close circuit
    fn should_close(&self, ctx: &CircuitContext) -> bool {
        self.state_data_half_open()
            .is_some_and(|data| data.consecutive_successes >= ctx.config.success_threshold)
    }
}

impl Circuit<Open> {
    /// Check if the cooldown has strictly elapsed since the circuit opened
    fn timeout_elapsed(&self, ctx: &CircuitContext) -> bool {
        let Some(data) = self.state_data_open() else {
            return true;
        };
        let elapsed = ctx.clock.now().saturating_sub(data.opened_at);

        elapsed > data.cooldown
    }
}

/// The machine and the Closed failure streak, guarded by one lock
struct Inner {
    machine: DynamicCircuit,
    consecutive_failures: u32,
}

impl Inner {
    fn new(context: CircuitContext) -> Self {
        Self {
            machine: DynamicCircuit::new(context),
            consecutive_failures: 0,
        }
    }

    fn state(&self) -> CircuitState {
        CircuitState::of(&self.machine)
    }
}

/// Circuit breaker public API
///
/// Shareable across threads: every method takes `&self`.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    context: CircuitContext,
    callbacks: Callbacks,
}

impl CircuitBreaker {
    /// Create an unnamed circuit breaker with the given thresholds and cooldown
    ///
    /// # Panics
    ///
    /// Panics if either threshold is 0.
    pub fn new(failure_threshold: u32, success_threshold: u32, open_timeout: Duration) -> Self {
        Self::builder("default")
            .failure_threshold(failure_threshold)
            .success_threshold(success_threshold)
            .open_timeout(open_timeout)
            .build()
    }

    /// Create a named circuit breaker from a configuration
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`Config::validate`]).
    pub fn with_config(name: impl Into<String>, config: Config) -> Self {
        Self::builder(name).config(config).build()
    }

    /// Create a circuit breaker with custom context and callbacks (used by builder)
    pub(crate) fn with_context_and_callbacks(
        context: CircuitContext,
        callbacks: Callbacks,
    ) -> Self {
        let inner = Mutex::new(Inner::new(context.clone()));

        Self {
            inner,
            context,
            callbacks,
        }
    }

    /// Create a new circuit breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::CircuitBuilder {
        crate::builder::CircuitBuilder::new(name)
    }

    /// Execute a fallible operation with circuit breaker protection
    ///
    /// Returns `CircuitError::Open` without running `f` while the circuit is
    /// open, otherwise runs `f` and records its outcome.
    pub fn call<T, E, F>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.admit()?;

        let result = f();
        self.settle(result.is_ok());

        result.map_err(CircuitError::Execution)
    }

    /// Async counterpart of [`call`](Self::call)
    ///
    /// The lock is released while the future runs, so the future may be
    /// held across await points freely.
    pub async fn call_async<T, E, F, Fut>(&self, f: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit()?;

        let result = f().await;
        self.settle(result.is_ok());

        result.map_err(CircuitError::Execution)
    }

    /// Record a success observed outside of `call`
    pub fn record_success(&self) {
        self.settle(true);
    }

    /// Record a failure observed outside of `call`
    pub fn record_failure(&self) {
        self.settle(false);
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.lock().state()
    }

    /// Get current state name
    pub fn state_name(&self) -> &'static str {
        self.state().as_str()
    }

    /// Check if circuit is open
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Check if circuit is closed
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// Consistent snapshot of state and counters
    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        let state = inner.state();

        CircuitStats {
            state,
            failure_count: if state == CircuitState::Closed {
                inner.consecutive_failures
            } else {
                0
            },
            success_count: inner
                .machine
                .half_open_data()
                .map_or(0, |d| d.consecutive_successes),
            opened_at: inner.machine.open_data().map(|d| d.opened_at),
        }
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Force the circuit back to Closed with zeroed counters
    pub fn reset(&self) {
        *self.lock() = Inner::new(self.context.clone());
        tracing::info!(circuit = %self.context.name, "Circuit reset");
    }

    /// Gate a call: reject while Open, or move to HalfOpen once the cooldown elapsed
    fn admit<E>(&self) -> Result<(), CircuitError<E>> {
        let mut inner = self.lock();

        if inner.state() != CircuitState::Open {
            return Ok(());
        }

        if inner.machine.handle(CircuitEvent::AttemptReset).is_ok() {
            drop(inner);
            self.callbacks
                .announce(&self.context.name, Transition::HalfOpened);
            return Ok(());
        }

        let (opened_at, cooldown) = inner
            .machine
            .open_data()
            .map(|d| (d.opened_at, d.cooldown))
            .unwrap_or_default();
        drop(inner);

        let elapsed = self.context.clock.now().saturating_sub(opened_at);
        let retry_after = cooldown.saturating_sub(elapsed);
        tracing::debug!(
            circuit = %self.context.name,
            retry_after = ?retry_after,
            "Circuit open, rejecting call"
        );

        Err(CircuitError::Open {
            circuit: self.context.name.clone(),
            opened_at,
            retry_after,
        })
    }

    /// Apply the outcome of a call and announce any resulting transition
    fn settle(&self, succeeded: bool) {
        let transition = {
            let mut inner = self.lock();
            if succeeded {
                Self::on_success(&mut inner)
            } else {
                self.on_failure(&mut inner)
            }
        };

        if let Some(transition) = transition {
            self.callbacks.announce(&self.context.name, transition);
        }
    }

    fn on_success(inner: &mut Inner) -> Option<Transition> {
        match inner.state() {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                None
            }
            CircuitState::HalfOpen => {
                // Entering HalfOpen always fills its data slot
                let successes = inner.machine.half_open_data_mut().map_or(0, |data| {
                    data.consecutive_successes = data.consecutive_successes.saturating_add(1);
                    data.consecutive_successes
                });

                if inner.machine.handle(CircuitEvent::Close).is_ok() {
                    inner.consecutive_failures = 0;
                    Some(Transition::Closed { successes })
                } else {
                    None
                }
            }
            // Outcome of a call admitted before the circuit reopened
            CircuitState::Open => None,
        }
    }

    fn on_failure(&self, inner: &mut Inner) -> Option<Transition> {
        match inner.state() {
            CircuitState::Closed => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                let failures = inner.consecutive_failures;

                if failures < self.context.config.failure_threshold {
                    tracing::debug!(
                        circuit = %self.context.name,
                        failures,
                        threshold = self.context.config.failure_threshold,
                        "Circuit recorded failure"
                    );
                    return None;
                }

                if inner.machine.handle(CircuitEvent::Trip).is_ok() {
                    inner.consecutive_failures = 0;
                    self.mark_open(&mut inner.machine);
                    Some(Transition::Tripped { failures })
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                if inner.machine.handle(CircuitEvent::Trip).is_ok() {
                    self.mark_open(&mut inner.machine);
                    Some(Transition::Reopened)
                } else {
                    None
                }
            }
            CircuitState::Open => None,
        }
    }

    /// Stamp the Open state with the failure time and the cooldown it waits out
    fn mark_open(&self, machine: &mut DynamicCircuit) {
        if let Some(data) = machine.open_data_mut() {
            data.opened_at = self.context.clock.now();
            data.cooldown = self.context.config.cooldown();
        }
    }

    // No user code runs under the lock, so a poisoned lock still holds a consistent machine
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.context.name)
            .field("config", &self.context.config)
            .field("state", &self.state())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
