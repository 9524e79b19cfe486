use crate::config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use crate::{CircuitBreaker, CircuitBreakerService};
use std::sync::Arc;
use tower::Layer;

/// A Tower Layer that applies circuit breaker behavior to an inner service.
///
/// A layer built from a configuration gives every service it wraps a fresh
/// breaker. A layer built with [`with_breaker`](Self::with_breaker) puts
/// every wrapped service behind the same breaker.
///
/// ```rust
/// use tower::{ServiceBuilder, service_fn};
/// use tripwire_circuitbreaker::CircuitBreakerLayer;
/// use std::time::Duration;
///
/// let layer = CircuitBreakerLayer::builder()
///     .failure_threshold(3)
///     .failure_time_window(Duration::from_secs(10))
///     .open_timeout(Duration::from_secs(5))
///     .build_layer()
///     .unwrap();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) }));
/// # let _ = service;
/// ```
#[derive(Clone, Debug)]
pub struct CircuitBreakerLayer {
    source: BreakerSource,
}

#[derive(Clone, Debug)]
enum BreakerSource {
    Config(Arc<CircuitBreakerConfig>),
    Shared(CircuitBreaker),
}

impl CircuitBreakerLayer {
    /// Creates a layer that builds one breaker per wrapped service.
    pub fn new(config: impl Into<Arc<CircuitBreakerConfig>>) -> Self {
        Self {
            source: BreakerSource::Config(config.into()),
        }
    }

    /// Creates a layer whose services all share `breaker`.
    pub fn with_breaker(breaker: CircuitBreaker) -> Self {
        Self {
            source: BreakerSource::Shared(breaker),
        }
    }

    /// Creates a new builder for configuring a circuit breaker layer.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Wraps the given service, returning the concrete breaker service.
    pub fn layer_fn<S>(&self, service: S) -> CircuitBreakerService<S> {
        CircuitBreakerService::new(service, self.breaker())
    }

    fn breaker(&self) -> CircuitBreaker {
        match &self.source {
            BreakerSource::Config(config) => CircuitBreaker::with_config(Arc::clone(config)),
            BreakerSource::Shared(breaker) => breaker.clone(),
        }
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreakerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        self.layer_fn(service)
    }
}
