//! A circuit breaker guarding calls to an unreliable operation.
//!
//! The breaker counts failures inside a sliding time window. Once the count
//! reaches the configured threshold the circuit trips and rejects every call
//! without running the operation. After the open timeout the next call is let
//! through; the circuit closes, its failure history is wiped, and that call's
//! own outcome is recorded as usual.
//!
//! ## States
//! - **Closed**: calls pass through to the operation
//! - **Open**: calls are rejected with [`CircuitBreakerError::OpenCircuit`]
//!
//! A success always clears the failure history, so only an unbroken streak of
//! failures can trip the circuit.
//!
//! ## Usage
//!
//! ```rust
//! use tripwire_circuitbreaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(3, Duration::from_secs(10), Duration::from_secs(5))
//!     .expect("valid configuration");
//!
//! for _ in 0..3 {
//!     let result = breaker.execute(|| Err::<u32, _>("backend unavailable"));
//!     assert!(matches!(result, Err(CircuitBreakerError::Inner("backend unavailable"))));
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//!
//! // The operation is not invoked while the circuit is open.
//! match breaker.execute(|| Ok::<u32, &str>(42)) {
//!     Err(CircuitBreakerError::OpenCircuit) => {}
//!     other => panic!("expected rejection, got {other:?}"),
//! }
//! ```
//!
//! ### Async operations
//!
//! ```rust
//! use tripwire_circuitbreaker::CircuitBreaker;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::builder().name("inventory").build().unwrap();
//!
//! let stock = breaker
//!     .execute_async(|| async { Ok::<_, std::io::Error>(17u32) })
//!     .await;
//! assert_eq!(stock.unwrap(), 17);
//! # }
//! ```
//!
//! ### Tower services
//!
//! ```rust
//! use tripwire_circuitbreaker::CircuitBreakerLayer;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let layer = CircuitBreakerLayer::builder()
//!     .failure_threshold(5)
//!     .build_layer()
//!     .unwrap();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
//! # let _ = service;
//! ```
//!
//! ## Concurrency
//!
//! [`CircuitBreaker`] is a cheap `Clone` handle; clones share one state. The
//! internal lock is held for the admission decision and again for recording
//! the outcome, never while the operation runs. Outcomes of calls that race
//! each other are therefore applied in completion order.
//!
//! ## Feature Flags
//! - `tracing`: logs admission decisions, pruning, and state transitions
//! - `serde`: enables `Serialize` for `CircuitState` and `CircuitMetrics`

use crate::circuit::Circuit;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::time::Instant;
#[cfg(feature = "tracing")]
use tracing::debug;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::{CircuitBreakerError, ConfigError};
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;
pub use service::CircuitBreakerService;

mod circuit;
mod config;
mod error;
mod events;
mod layer;
mod service;

/// A circuit breaker guarding one logical operation.
///
/// Cloning yields another handle to the same breaker.
#[derive(Clone)]
pub struct CircuitBreaker {
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig>,
}

impl CircuitBreaker {
    /// Creates a breaker that trips after `failure_threshold` failures within
    /// `failure_time_window` and stays open for `open_timeout`.
    ///
    /// Returns a [`ConfigError`] if the threshold or either duration is zero.
    pub fn new(
        failure_threshold: usize,
        failure_time_window: std::time::Duration,
        open_timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        Self::builder()
            .failure_threshold(failure_threshold)
            .failure_time_window(failure_time_window)
            .open_timeout(open_timeout)
            .build()
    }

    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Creates a breaker from a validated configuration.
    pub fn with_config(config: impl Into<Arc<CircuitBreakerConfig>>) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            circuit: Arc::new(Mutex::new(Circuit::new(
                Arc::clone(&state_atomic),
                Instant::now(),
            ))),
            state_atomic,
            config: config.into(),
        }
    }

    /// Runs `operation` unless the circuit is open.
    ///
    /// - `Ok(value)`: the operation succeeded; failure history is cleared.
    /// - `Err(Inner(e))`: the operation failed; the failure is recorded and
    ///   may trip the circuit.
    /// - `Err(OpenCircuit)`: the circuit is open; `operation` was not called.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if !self.acquire() {
            return Err(CircuitBreakerError::OpenCircuit);
        }

        let result = operation();
        self.record(&result);
        result.map_err(CircuitBreakerError::Inner)
    }

    /// Async counterpart of [`execute`](Self::execute).
    ///
    /// `operation` is only called, and its future only awaited, when the call
    /// is admitted. No lock is held across the await. If the returned future
    /// is dropped before the operation completes, no outcome is recorded.
    pub async fn execute_async<T, E, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.acquire() {
            return Err(CircuitBreakerError::OpenCircuit);
        }

        let result = operation().await;
        self.record(&result);
        result.map_err(CircuitBreakerError::Inner)
    }

    fn acquire(&self) -> bool {
        #[cfg(feature = "tracing")]
        debug!(
            breaker = %self.config.name,
            "checking if call is permitted by circuit breaker"
        );

        let permitted = {
            let mut circuit = self.circuit.lock();
            circuit.try_acquire(&self.config, Instant::now())
        };

        #[cfg(feature = "tracing")]
        {
            let cb_name = &self.config.name;
            if permitted {
                tracing::trace!(breaker = %cb_name, "circuit breaker permitted call");
            } else {
                tracing::trace!(
                    breaker = %cb_name,
                    "circuit breaker rejected call (circuit open)"
                );
            }
        }

        permitted
    }

    fn record<T, E>(&self, result: &Result<T, E>) {
        let mut circuit = self.circuit.lock();
        let now = Instant::now();
        match result {
            Ok(_) => circuit.record_success(&self.config, now),
            Err(_) => circuit.record_failure(&self.config, now),
        }
    }

    /// Returns the current state without taking the lock.
    ///
    /// An open circuit whose timeout has elapsed still reports `Open`; only
    /// the next call re-evaluates it.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns a consistent snapshot of the breaker's bookkeeping.
    pub fn metrics(&self) -> CircuitMetrics {
        let circuit = self.circuit.lock();
        circuit.metrics(&self.config, Instant::now())
    }

    /// Returns the recorded failure timestamps, oldest first.
    pub fn failure_log(&self) -> Vec<Instant> {
        self.circuit.lock().failure_log().collect()
    }

    /// Returns when the circuit last tripped, while it is open.
    pub fn opened_at(&self) -> Option<Instant> {
        self.circuit.lock().opened_at()
    }

    /// Closes the circuit and clears failure history.
    pub fn reset(&self) {
        let mut circuit = self.circuit.lock();
        circuit.reset(&self.config, Instant::now());
    }

    /// Returns the breaker's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
