//! Core infrastructure for tripwire.
//!
//! Event plumbing shared by tripwire guards:
//! - [`Event`] for anything a guard reports
//! - [`Observer`] and [`FnObserver`] for the receiving side
//! - [`Observers`] for ordered fan-out with panic isolation

pub mod events;

pub use events::{Event, FnObserver, Observer, Observers, SharedObserver};
