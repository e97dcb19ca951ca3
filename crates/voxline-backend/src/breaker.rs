//! Circuit breaker shared by every session's backend calls.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Endpoint classes with independent circuits.
///
/// Order CRUD and delivery lookups live on different backend subsystems;
/// one failing must not take the other down with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Order search, fetch, create, delivery patch, confirm.
    Orders,
    /// Delivery cost calculation and pickup-point listing.
    Delivery,
}

impl EndpointClass {
    /// Label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Delivery => "delivery",
        }
    }
}

/// Breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Consecutive transient failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit short-circuits before permitting a
    /// half-open trial.
    pub cooldown: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Per-class circuit state.
#[derive(Debug, Clone, Copy)]
enum CircuitState {
    /// Requests flow; counts consecutive failures.
    Closed { failures: u32 },
    /// Requests short-circuit until the cooldown elapses.
    Open { since: Instant },
    /// One trial request is in flight; everyone else short-circuits. A
    /// trial whose caller never reports back frees the slot after another
    /// cooldown.
    HalfOpen { since: Instant },
}

/// Circuit breaker state for all endpoint classes.
///
/// Shared across every session via `Arc`. The mutex guards brief state
/// reads and transitions that never span an await point, so a std mutex
/// is both safe and cheaper than an async lock here.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    orders: Mutex<CircuitState>,
    delivery: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            orders: Mutex::new(CircuitState::Closed { failures: 0 }),
            delivery: Mutex::new(CircuitState::Closed { failures: 0 }),
        }
    }

    fn slot(&self, class: EndpointClass) -> &Mutex<CircuitState> {
        match class {
            EndpointClass::Orders => &self.orders,
            EndpointClass::Delivery => &self.delivery,
        }
    }

    /// Asks whether a request to `class` may be attempted right now.
    ///
    /// An open circuit past its cooldown transitions to half-open and
    /// admits exactly one trial; concurrent callers see `false` until the
    /// trial reports back.
    pub fn try_acquire(&self, class: EndpointClass) -> bool {
        let mut state = self.slot(class).lock().expect("breaker lock poisoned");
        match *state {
            CircuitState::Closed { .. } => true,
            CircuitState::HalfOpen { since } => {
                if since.elapsed() >= self.settings.cooldown {
                    // The trial never reported back (its caller went
                    // away); the next caller becomes the trial instead of
                    // the circuit staying wedged.
                    tracing::warn!(
                        class = class.as_str(),
                        "half-open trial unresolved past cooldown, permitting another"
                    );
                    *state = CircuitState::HalfOpen { since: Instant::now() };
                    true
                } else {
                    false
                }
            }
            CircuitState::Open { since } => {
                if since.elapsed() >= self.settings.cooldown {
                    tracing::info!(class = class.as_str(), "circuit half-open, permitting trial");
                    *state = CircuitState::HalfOpen { since: Instant::now() };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful response. Closes the circuit from any state.
    pub fn record_success(&self, class: EndpointClass) {
        let mut state = self.slot(class).lock().expect("breaker lock poisoned");
        if matches!(*state, CircuitState::HalfOpen { .. } | CircuitState::Open { .. }) {
            tracing::info!(class = class.as_str(), "circuit closed");
        }
        *state = CircuitState::Closed { failures: 0 };
    }

    /// Records a transient failure (timeout, connect error, 5xx).
    ///
    /// A failed half-open trial reopens the circuit and restarts the
    /// cooldown; in the closed state failures accumulate until the
    /// threshold trips.
    pub fn record_failure(&self, class: EndpointClass) {
        let mut state = self.slot(class).lock().expect("breaker lock poisoned");
        *state = match *state {
            CircuitState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.settings.failure_threshold {
                    tracing::warn!(class = class.as_str(), failures, "circuit opened");
                    CircuitState::Open { since: Instant::now() }
                } else {
                    CircuitState::Closed { failures }
                }
            }
            CircuitState::HalfOpen { .. } => {
                tracing::warn!(class = class.as_str(), "half-open trial failed, circuit reopened");
                CircuitState::Open { since: Instant::now() }
            }
            open @ CircuitState::Open { .. } => open,
        };
    }
}
