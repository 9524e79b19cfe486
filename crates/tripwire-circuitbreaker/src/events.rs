use crate::CircuitState;
use std::time::Instant;
use tripwire_core::Event;

/// What a circuit breaker reports to its observers.
///
/// Every variant carries the breaker's `name` and the instant `at` which the
/// decision was made.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was admitted to the operation.
    CallPermitted {
        name: String,
        at: Instant,
        state: CircuitState,
    },
    /// A call was turned away because the circuit is open.
    CallRejected { name: String, at: Instant },
    /// The circuit moved between states.
    StateTransition {
        name: String,
        at: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// The operation succeeded and the failure log was cleared.
    SuccessRecorded {
        name: String,
        at: Instant,
        state: CircuitState,
    },
    /// The operation failed; `failures_in_window` counts it.
    FailureRecorded {
        name: String,
        at: Instant,
        state: CircuitState,
        failures_in_window: usize,
    },
}

impl Event for CircuitBreakerEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::CallPermitted { .. } => "call_permitted",
            Self::CallRejected { .. } => "call_rejected",
            Self::StateTransition { .. } => "state_transition",
            Self::SuccessRecorded { .. } => "success_recorded",
            Self::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn occurred_at(&self) -> Instant {
        match self {
            Self::CallPermitted { at, .. }
            | Self::CallRejected { at, .. }
            | Self::StateTransition { at, .. }
            | Self::SuccessRecorded { at, .. }
            | Self::FailureRecorded { at, .. } => *at,
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::CallPermitted { name, .. }
            | Self::CallRejected { name, .. }
            | Self::StateTransition { name, .. }
            | Self::SuccessRecorded { name, .. }
            | Self::FailureRecorded { name, .. } => name,
        }
    }
}
