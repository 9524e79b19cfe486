use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// The circuit is closed and calls pass through to the operation.
    Closed = 0,
    /// The circuit is tripped and calls are rejected until the open timeout elapses.
    Open = 1,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            _ => CircuitState::Closed,
        }
    }

    /// Returns a lowercase label suitable for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit breaker.
///
/// All fields come from a single lock acquisition, so they are consistent
/// with one another.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state of the circuit breaker.
    pub state: CircuitState,
    /// Failures currently held in the sliding window.
    ///
    /// The window is pruned only when a failure is recorded, so this may
    /// include failures that have since aged out.
    pub failure_count: usize,
    /// Number of failures in the window that trips the circuit.
    pub failure_threshold: usize,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
    /// While open, how long until the next call is admitted as a trial.
    pub remaining_open: Option<Duration>,
}

/// Internal state with the open timestamp carried by the `Open` variant, so
/// an open circuit always knows when it tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open { opened_at: Instant },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
        }
    }
}

pub(crate) struct Circuit {
    phase: Phase,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    // Failure timestamps, oldest first.
    failure_log: VecDeque<Instant>,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>, now: Instant) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            phase: Phase::Closed,
            state_atomic,
            last_state_change: now,
            failure_log: VecDeque::new(),
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.phase.state()
    }

    pub(crate) fn opened_at(&self) -> Option<Instant> {
        match self.phase {
            Phase::Open { opened_at } => Some(opened_at),
            Phase::Closed => None,
        }
    }

    pub(crate) fn failure_log(&self) -> impl Iterator<Item = Instant> + '_ {
        self.failure_log.iter().copied()
    }

    pub(crate) fn metrics(&self, config: &CircuitBreakerConfig, now: Instant) -> CircuitMetrics {
        let remaining_open = self.opened_at().map(|opened_at| {
            config
                .open_timeout
                .saturating_sub(now.saturating_duration_since(opened_at))
        });

        CircuitMetrics {
            state: self.state(),
            failure_count: self.failure_log.len(),
            failure_threshold: config.failure_threshold,
            time_since_state_change: now.saturating_duration_since(self.last_state_change),
            remaining_open,
        }
    }

    /// Decides whether a call may run.
    ///
    /// An open circuit whose timeout has strictly elapsed closes here, with
    /// its failure history wiped, and admits the caller in the same step.
    pub(crate) fn try_acquire(&mut self, config: &CircuitBreakerConfig, now: Instant) -> bool {
        if let Phase::Open { opened_at } = self.phase {
            if now.saturating_duration_since(opened_at) <= config.open_timeout {
                config
                    .observers
                    .notify(&CircuitBreakerEvent::CallRejected {
                        name: config.name.clone(),
                        at: now.into_std(),
                    });
                return false;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                breaker = %config.name,
                cleared = self.failure_log.len(),
                "open timeout elapsed, admitting trial call"
            );

            self.failure_log.clear();
            self.transition_to(Phase::Closed, config, now);
        }

        config
            .observers
            .notify(&CircuitBreakerEvent::CallPermitted {
                name: config.name.clone(),
                at: now.into_std(),
                state: self.state(),
            });
        true
    }

    /// A success wipes the whole failure history, not just one entry.
    pub(crate) fn record_success(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        let cleared = self.failure_log.len();
        self.failure_log.clear();

        #[cfg(feature = "tracing")]
        if cleared > 0 {
            tracing::debug!(breaker = %config.name, cleared, "success cleared failure history");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = cleared;

        config
            .observers
            .notify(&CircuitBreakerEvent::SuccessRecorded {
                name: config.name.clone(),
                at: now.into_std(),
                state: self.state(),
            });
    }

    pub(crate) fn record_failure(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        // Keep the log sorted even if a caller's clock reads go backwards.
        let now = match self.failure_log.back() {
            Some(&last) if last > now => last,
            _ => now,
        };

        self.failure_log.push_back(now);
        let expired = self.prune(config.failure_time_window, now);
        let failures_in_window = self.failure_log.len();

        #[cfg(feature = "tracing")]
        {
            if expired > 0 {
                tracing::debug!(
                    breaker = %config.name,
                    expired,
                    "discarded failures outside the window"
                );
            }
            tracing::debug!(
                breaker = %config.name,
                failures_in_window,
                threshold = config.failure_threshold,
                "failure recorded"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = expired;

        config
            .observers
            .notify(&CircuitBreakerEvent::FailureRecorded {
                name: config.name.clone(),
                at: now.into_std(),
                state: self.state(),
                failures_in_window,
            });

        // A failure landing after another call already tripped the circuit
        // does not push the reopen deadline back.
        if self.phase == Phase::Closed && failures_in_window >= config.failure_threshold {
            self.transition_to(Phase::Open { opened_at: now }, config, now);
        }
    }

    pub(crate) fn reset(&mut self, config: &CircuitBreakerConfig, now: Instant) {
        self.failure_log.clear();
        self.transition_to(Phase::Closed, config, now);
    }

    /// Drops failures older than `window` from the front of the log.
    ///
    /// The log is chronological, so the first survivor ends the scan.
    fn prune(&mut self, window: Duration, now: Instant) -> usize {
        let mut expired = 0;
        while let Some(&oldest) = self.failure_log.front() {
            if now.saturating_duration_since(oldest) > window {
                self.failure_log.pop_front();
                expired += 1;
            } else {
                break;
            }
        }
        expired
    }

    fn transition_to(&mut self, phase: Phase, config: &CircuitBreakerConfig, now: Instant) {
        let from_state = self.state();
        let to_state = phase.state();
        if from_state == to_state {
            return;
        }

        config
            .observers
            .notify(&CircuitBreakerEvent::StateTransition {
                name: config.name.clone(),
                at: now.into_std(),
                from_state,
                to_state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            breaker = %config.name,
            from = %from_state,
            to = %to_state,
            "circuit state transition"
        );

        self.phase = phase;
        self.state_atomic.store(to_state as u8, Ordering::Release);
        self.last_state_change = now;
    }
}
