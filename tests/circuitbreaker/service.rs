use futures::future::{BoxFuture, ready};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::advance;
use tower::{Layer, Service, ServiceBuilder, ServiceExt};
use tripwire_circuitbreaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerLayer, CircuitState,
};

fn layer(threshold: usize, open_timeout: Duration) -> CircuitBreakerLayer {
    CircuitBreakerLayer::builder()
        .failure_threshold(threshold)
        .failure_time_window(Duration::from_secs(10))
        .open_timeout(open_timeout)
        .name("service-test")
        .build_layer()
        .unwrap()
}

/// Requests flow through a closed circuit unchanged
#[tokio::test]
async fn closed_circuit_passes_requests() {
    let service = ServiceBuilder::new()
        .layer(layer(3, Duration::from_secs(1)))
        .service(tower::service_fn(|req: String| async move {
            Ok::<_, std::io::Error>(req.to_uppercase())
        }));

    let response = service.oneshot("ping".to_string()).await.unwrap();
    assert_eq!(response, "PING");
}

/// Inner errors trip the circuit and later requests are rejected before the inner service runs
#[tokio::test(start_paused = true)]
async fn inner_errors_trip_circuit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);

    let inner = tower::service_fn(move |req: u32| {
        c.fetch_add(1, Ordering::SeqCst);
        async move {
            if req == 0 {
                Err::<u32, _>("bad request")
            } else {
                Ok(req * 2)
            }
        }
    });

    let mut service = layer(2, Duration::from_secs(1)).layer(inner);

    for _ in 0..2 {
        let err = service.ready().await.unwrap().call(0).await.unwrap_err();
        assert_eq!(err.into_inner(), Some("bad request"));
    }
    assert_eq!(service.state(), CircuitState::Open);

    let err = service.ready().await.unwrap().call(21).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    advance(Duration::from_millis(1001)).await;
    let ok = service.ready().await.unwrap().call(21).await.unwrap();
    assert_eq!(ok, 42);
    assert_eq!(service.state(), CircuitState::Closed);
}

/// Cloned services share one breaker
#[tokio::test]
async fn cloned_services_share_state() {
    let inner = tower::service_fn(|_req: ()| async { Err::<(), _>("down") });
    let service = layer(2, Duration::from_secs(60)).layer(inner);

    let _ = service.clone().oneshot(()).await;
    let _ = service.clone().oneshot(()).await;

    assert!(service.breaker().is_open());
    let err = service.oneshot(()).await.unwrap_err();
    assert!(matches!(err, CircuitBreakerError::OpenCircuit));
}

/// A shared breaker guards several distinct services
#[tokio::test]
async fn shared_breaker_across_services() {
    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .open_timeout(Duration::from_secs(60))
        .name("shared-db")
        .build()
        .unwrap();
    let layer = CircuitBreakerLayer::with_breaker(breaker.clone());

    let reads = layer.layer(tower::service_fn(|_req: ()| async { Err::<(), _>("read timeout") }));
    let writes = layer.layer(tower::service_fn(|_req: ()| async { Ok::<_, &str>("written") }));

    let _ = reads.oneshot(()).await;
    assert!(breaker.is_open());

    let err = writes.oneshot(()).await.unwrap_err();
    assert!(err.is_circuit_open());
}

/// Readiness errors from the inner service surface as inner errors
#[tokio::test]
async fn poll_ready_error_is_mapped() {
    #[derive(Clone)]
    struct NeverReady;

    impl Service<()> for NeverReady {
        type Response = ();
        type Error = &'static str;
        type Future = BoxFuture<'static, Result<(), &'static str>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Err("pool exhausted"))
        }

        fn call(&mut self, _req: ()) -> Self::Future {
            Box::pin(ready(Ok(())))
        }
    }

    let mut service = layer(1, Duration::from_secs(1)).layer_fn(NeverReady);
    let err = match service.ready().await {
        Ok(_) => panic!("service should not become ready"),
        Err(err) => err,
    };

    assert_eq!(err.into_inner(), Some("pool exhausted"));
    assert_eq!(service.state(), CircuitState::Closed, "readiness is not an outcome");
}

/// The layer exposes the concrete service for inspection
#[tokio::test]
async fn layer_fn_gives_access_to_inner() {
    let service = layer(1, Duration::from_secs(1)).layer_fn(tower::service_fn(|x: u8| async move {
        Ok::<_, ()>(x)
    }));

    assert_eq!(service.breaker().name(), "service-test");
    let _inner = service.get_ref();
    let inner = service.into_inner();
    assert_eq!(inner.oneshot(7).await.unwrap(), 7);
}
