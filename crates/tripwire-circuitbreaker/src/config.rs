use crate::error::ConfigError;
use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitBreakerLayer, CircuitState};
use std::time::Duration;
use tripwire_core::Observers;

/// Configuration for a circuit breaker.
///
/// Only obtainable through [`CircuitBreakerConfigBuilder`], so every instance
/// has already passed validation.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: usize,
    pub(crate) failure_time_window: Duration,
    pub(crate) open_timeout: Duration,
    pub(crate) observers: Observers<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Preset: balanced breaker.
    ///
    /// - 5 failures within 60 seconds trip the circuit
    /// - 30 seconds open before a trial call
    pub fn standard() -> CircuitBreakerConfigBuilder {
        Self::builder()
            .failure_threshold(5)
            .failure_time_window(Duration::from_secs(60))
            .open_timeout(Duration::from_secs(30))
    }

    /// Preset: trips early and recovers early, for latency-sensitive callers.
    ///
    /// - 3 failures within 10 seconds trip the circuit
    /// - 10 seconds open before a trial call
    pub fn fast_fail() -> CircuitBreakerConfigBuilder {
        Self::builder()
            .failure_threshold(3)
            .failure_time_window(Duration::from_secs(10))
            .open_timeout(Duration::from_secs(10))
    }

    /// Preset: tolerates bursts of transient failures.
    ///
    /// - 10 failures within 120 seconds trip the circuit
    /// - 60 seconds open before a trial call
    pub fn tolerant() -> CircuitBreakerConfigBuilder {
        Self::builder()
            .failure_threshold(10)
            .failure_time_window(Duration::from_secs(120))
            .open_timeout(Duration::from_secs(60))
    }

    /// Number of failures within the window that trips the circuit.
    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    /// Failures older than this are discarded from the window.
    pub fn failure_time_window(&self) -> Duration {
        self.failure_time_window
    }

    /// How long a tripped circuit rejects calls.
    pub fn open_timeout(&self) -> Duration {
        self.open_timeout
    }

    /// Name used in events and log fields.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: usize,
    failure_time_window: Duration,
    open_timeout: Duration,
    observers: Observers<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            failure_time_window: Duration::from_secs(60),
            open_timeout: Duration::from_secs(30),
            observers: Observers::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many failures inside the window trip the circuit.
    ///
    /// Must be greater than zero.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the sliding window over which failures are counted.
    ///
    /// Must be non-zero.
    ///
    /// Default: 60 seconds
    pub fn failure_time_window(mut self, window: Duration) -> Self {
        self.failure_time_window = window;
        self
    }

    /// Sets how long the circuit stays open before admitting a trial call.
    ///
    /// Must be non-zero.
    ///
    /// Default: 30 seconds
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback invoked on every state transition.
    ///
    /// Callbacks run while the breaker's lock is held. They may call
    /// [`CircuitBreaker::state`], which is lock-free, but calling any other
    /// method on the same breaker from a callback deadlocks.
    ///
    /// Called with the state transitioned **from**, then the state
    /// transitioned **to**.
    ///
    /// # Example
    /// ```rust
    /// use tripwire_circuitbreaker::{CircuitBreaker, CircuitState};
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .on_state_transition(|from, to| {
    ///         if to == CircuitState::Open {
    ///             eprintln!("breaker tripped ({from} -> {to})");
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # let _ = breaker;
    /// ```
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.observers.register_fn(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        });
        self
    }

    /// Registers a callback invoked when a call is admitted.
    ///
    /// The same locking rules as
    /// [`on_state_transition`](Self::on_state_transition) apply.
    ///
    /// The state passed is the state after admission. A call that closes an
    /// expired open circuit reports `Closed`.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.observers.register_fn(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback invoked when a call is rejected by an open circuit.
    ///
    /// The same locking rules as
    /// [`on_state_transition`](Self::on_state_transition) apply.
    ///
    /// # Example
    /// ```rust
    /// use tripwire_circuitbreaker::CircuitBreaker;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let rejected = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&rejected);
    ///
    /// let breaker = CircuitBreaker::builder()
    ///     .failure_threshold(1)
    ///     .on_call_rejected(move || {
    ///         counter.fetch_add(1, Ordering::SeqCst);
    ///     })
    ///     .build()
    ///     .unwrap();
    ///
    /// let _ = breaker.execute(|| Err::<(), _>("boom"));
    /// let _ = breaker.execute(|| Ok::<_, &str>(()));
    /// assert_eq!(rejected.load(Ordering::SeqCst), 1);
    /// ```
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.register_fn(move |event: &CircuitBreakerEvent| {
            if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                f();
            }
        });
        self
    }

    /// Registers a callback invoked when a successful call is recorded.
    ///
    /// The same locking rules as
    /// [`on_state_transition`](Self::on_state_transition) apply.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.observers.register_fn(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                f(*state);
            }
        });
        self
    }

    /// Registers a callback invoked when a failed call is recorded.
    ///
    /// The same locking rules as
    /// [`on_state_transition`](Self::on_state_transition) apply.
    ///
    /// Called with the state at recording time and the number of failures in
    /// the window after pruning, including this one.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, usize) + Send + Sync + 'static,
    {
        self.observers.register_fn(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::FailureRecorded {
                state,
                failures_in_window,
                ..
            } = event
            {
                f(*state, *failures_in_window);
            }
        });
        self
    }

    /// Validates the settings and returns the configuration.
    ///
    /// Fields are checked in declaration order; the first invalid one is
    /// reported.
    pub fn build_config(self) -> Result<CircuitBreakerConfig, ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidFailureThreshold);
        }
        if self.failure_time_window.is_zero() {
            return Err(ConfigError::InvalidFailureTimeWindow);
        }
        if self.open_timeout.is_zero() {
            return Err(ConfigError::InvalidOpenTimeout);
        }

        Ok(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            failure_time_window: self.failure_time_window,
            open_timeout: self.open_timeout,
            observers: self.observers,
            name: self.name,
        })
    }

    /// Builds a standalone circuit breaker.
    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        self.build_config().map(CircuitBreaker::with_config)
    }

    /// Builds a Tower layer; each service it wraps gets its own breaker.
    pub fn build_layer(self) -> Result<CircuitBreakerLayer, ConfigError> {
        self.build_config().map(CircuitBreakerLayer::new)
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
