//! Drives a breaker with an operation that fails most of the time.
//! Run with: cargo run --example unreliable_operation
//! With logs: RUST_LOG=debug cargo run --example unreliable_operation

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tripwire_circuitbreaker::{CircuitBreaker, CircuitBreakerError};

#[derive(Debug)]
struct ServiceUnavailable;

fn unreliable_operation() -> Result<&'static str, ServiceUnavailable> {
    if rand::rng().random_bool(0.9) {
        Err(ServiceUnavailable)
    } else {
        Ok("operation succeeded")
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Trips after 8 failures within 10s and stays open for 5s.
    let breaker = CircuitBreaker::builder()
        .failure_threshold(8)
        .failure_time_window(Duration::from_secs(10))
        .open_timeout(Duration::from_secs(5))
        .name("unreliable")
        .on_state_transition(|from, to| println!("circuit {from} -> {to}"))
        .build()
        .expect("valid breaker configuration");

    for attempt in 1..=40 {
        match breaker.execute(unreliable_operation) {
            Ok(message) => println!("#{attempt}: {message}"),
            Err(CircuitBreakerError::OpenCircuit) => {
                println!("#{attempt}: circuit open, call not attempted")
            }
            Err(CircuitBreakerError::Inner(err)) => println!("#{attempt}: failed: {err:?}"),
        }
        sleep(Duration::from_millis(500)).await;
    }

    println!("final metrics: {:?}", breaker.metrics());
}
