//! Typed events and the observers that receive them.
//!
//! A guard reports each decision it makes as an [`Event`]. Observers are
//! collected in an [`Observers`] list and notified synchronously, on the
//! thread that made the decision, in the order they were registered.

use std::fmt;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// Something a guard reports.
pub trait Event: fmt::Debug + Send + Sync {
    /// Short snake_case label such as `"call_rejected"`.
    fn kind(&self) -> &'static str;

    /// When the guard made the decision.
    fn occurred_at(&self) -> Instant;

    /// Name of the guard instance that reported it.
    fn source(&self) -> &str;
}

/// Receives events of type `E`.
pub trait Observer<E: Event>: Send + Sync {
    /// Called once per notified event.
    fn observe(&self, event: &E);
}

/// A reference-counted observer.
pub type SharedObserver<E> = Arc<dyn Observer<E>>;

/// Registration-ordered observers for one event type.
///
/// Clones share the registered observers but each clone can grow on its own.
pub struct Observers<E: Event> {
    inner: Vec<SharedObserver<E>>,
}

impl<E: Event> Observers<E> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Appends an observer.
    pub fn register<O>(&mut self, observer: O)
    where
        O: Observer<E> + 'static,
    {
        self.inner.push(Arc::new(observer));
    }

    /// Appends a closure as an observer.
    pub fn register_fn<F>(&mut self, f: F)
    where
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(FnObserver::new(f));
    }

    /// Hands `event` to every observer.
    ///
    /// An observer that panics is skipped over; the rest still see the event
    /// and the panic does not reach the caller.
    pub fn notify(&self, event: &E) {
        for observer in &self.inner {
            if catch_unwind(AssertUnwindSafe(|| observer.observe(event))).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    source = event.source(),
                    kind = event.kind(),
                    "observer panicked; continuing with the rest"
                );
            }
        }
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<E: Event> Clone for Observers<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Event> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observers({})", self.inner.len())
    }
}

/// Adapts a closure into an [`Observer`].
pub struct FnObserver<E, F> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnObserver<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> Observer<E> for FnObserver<E, F>
where
    E: Event,
    F: Fn(&E) + Send + Sync,
{
    fn observe(&self, event: &E) {
        (self.f)(event);
    }
}
