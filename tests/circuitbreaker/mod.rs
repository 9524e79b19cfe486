//! Circuit breaker integration tests.
//!
//! Test organization:
//! - scenarios.rs: trip, window expiry, timeout recovery, success reset
//! - recovery.rs: behavior around the open timeout boundary
//! - async_execute.rs: async operations
//! - service.rs: Tower layer and service
//! - events.rs: observers and logging
//! - concurrency.rs: shared breakers across threads and tasks

mod events;
mod service;
