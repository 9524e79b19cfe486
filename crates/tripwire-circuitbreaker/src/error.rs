use thiserror::Error;

/// Errors returned when running an operation through a circuit breaker.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit is open; call not permitted")]
    OpenCircuit,

    /// The operation ran and failed.
    #[error("operation failed: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the call was rejected by an open circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit)
    }

    /// Returns true if the operation itself failed.
    pub fn is_inner(&self) -> bool {
        matches!(self, CircuitBreakerError::Inner(_))
    }

    /// Returns a reference to the operation's error, if any.
    pub fn inner(&self) -> Option<&E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::OpenCircuit => None,
        }
    }

    /// Returns the operation's error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::OpenCircuit => None,
        }
    }
}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(err: E) -> Self {
        CircuitBreakerError::Inner(err)
    }
}

/// A circuit breaker setting that cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The failure threshold was zero.
    #[error("failure threshold must be greater than zero")]
    InvalidFailureThreshold,

    /// The failure time window was zero.
    #[error("failure time window must be greater than zero")]
    InvalidFailureTimeWindow,

    /// The open timeout was zero.
    #[error("open timeout must be greater than zero")]
    InvalidOpenTimeout,
}
