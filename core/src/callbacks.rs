//! Transition hooks for circuit breakers
//!
//! Hooks run after the breaker has released its lock, so a hook may safely
//! inspect the breaker that invoked it.

use std::sync::Arc;

/// Hook invoked with the circuit name
pub type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// A state change produced by one bookkeeping step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Closed -> Open after `failures` consecutive failures
    Tripped { failures: u32 },
    /// HalfOpen -> Open after a failed trial
    Reopened,
    /// Open -> HalfOpen once the cooldown elapsed
    HalfOpened,
    /// HalfOpen -> Closed after `successes` consecutive successes
    Closed { successes: u32 },
}

/// Callbacks for circuit breaker transitions
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<Hook>,
    pub on_close: Option<Hook>,
    pub on_half_open: Option<Hook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a transition and fire the matching hook
    pub fn announce(&self, circuit: &str, transition: Transition) {
        let hook = match transition {
            Transition::Tripped { failures } => {
                tracing::warn!(circuit = %circuit, failures, "Circuit opened due to failures");
                &self.on_open
            }
            Transition::Reopened => {
                tracing::warn!(circuit = %circuit, "Circuit reopened after half-open failure");
                &self.on_open
            }
            Transition::HalfOpened => {
                tracing::debug!(circuit = %circuit, "Circuit half-open, admitting trial call");
                &self.on_half_open
            }
            Transition::Closed { successes } => {
                tracing::info!(
                    circuit = %circuit,
                    successes,
                    "Circuit closed after successful recovery"
                );
                &self.on_close
            }
        };

        if let Some(callback) = hook {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}
