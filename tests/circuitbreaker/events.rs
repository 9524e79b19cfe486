use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::time::advance;
use tripwire_circuitbreaker::{CircuitBreaker, CircuitState};

/// A full trip-and-recover cycle emits every event kind the expected number of times
#[tokio::test(start_paused = true)]
async fn lifecycle_events() {
    let permitted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let successes = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(Mutex::new(Vec::new()));
    let transitions = Arc::new(Mutex::new(Vec::new()));

    let p = Arc::clone(&permitted);
    let r = Arc::clone(&rejected);
    let s = Arc::clone(&successes);
    let f = Arc::clone(&failures);
    let t = Arc::clone(&transitions);

    let breaker = CircuitBreaker::builder()
        .failure_threshold(2)
        .failure_time_window(Duration::from_secs(10))
        .open_timeout(Duration::from_secs(1))
        .name("lifecycle")
        .on_call_permitted(move |_| {
            p.fetch_add(1, Ordering::SeqCst);
        })
        .on_call_rejected(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .on_success(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .on_failure(move |state, in_window| {
            f.lock().unwrap().push((state, in_window));
        })
        .on_state_transition(move |from, to| {
            t.lock().unwrap().push((from, to));
        })
        .build()
        .unwrap();

    let _ = breaker.execute(|| Err::<(), _>("a"));
    let _ = breaker.execute(|| Err::<(), _>("b"));
    let _ = breaker.execute(|| Ok::<_, &str>(()));
    advance(Duration::from_secs(2)).await;
    let _ = breaker.execute(|| Ok::<_, &str>(()));

    assert_eq!(permitted.load(Ordering::SeqCst), 3);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![(CircuitState::Closed, 1), (CircuitState::Closed, 2)]
    );
    assert_eq!(
        *transitions.lock().unwrap(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::Closed),
        ]
    );
}

/// The trial call after the timeout is reported as permitted in the closed state
#[tokio::test(start_paused = true)]
async fn trial_call_reports_closed_state() {
    let states = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&states);

    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .open_timeout(Duration::from_millis(100))
        .on_call_permitted(move |state| s.lock().unwrap().push(state))
        .build()
        .unwrap();

    let _ = breaker.execute(|| Err::<(), _>(()));
    advance(Duration::from_millis(150)).await;
    let _ = breaker.execute(|| Ok::<_, ()>(()));

    assert_eq!(
        *states.lock().unwrap(),
        vec![CircuitState::Closed, CircuitState::Closed]
    );
}

/// A panicking callback does not break the breaker or later callbacks
#[tokio::test]
async fn panicking_callback_is_isolated() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&transitions);

    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_state_transition(|_, _| panic!("callback bug"))
        .on_state_transition(move |_, _| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let _ = breaker.execute(|| Err::<(), _>(()));

    assert!(breaker.is_open());
    assert_eq!(transitions.load(Ordering::SeqCst), 1);
}

/// Callbacks may read the lock-free state of the breaker that invoked them
#[tokio::test]
async fn callback_can_read_state_of_same_breaker() {
    let handle: Arc<OnceLock<CircuitBreaker>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let h = Arc::clone(&handle);
    let s = Arc::clone(&seen);
    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_state_transition(move |_, _| {
            if let Some(breaker) = h.get() {
                s.lock().unwrap().push(breaker.state());
            }
        })
        .build()
        .unwrap();
    let _ = handle.set(breaker.clone());

    let _ = breaker.execute(|| Err::<(), _>(()));

    assert!(breaker.is_open());
    // The state mirror is published after observers run.
    assert_eq!(*seen.lock().unwrap(), vec![CircuitState::Closed]);
}

/// Manual reset emits a transition only when the state changes
#[tokio::test]
async fn reset_emits_transition_when_open() {
    let transitions = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&transitions);

    let breaker = CircuitBreaker::builder()
        .failure_threshold(1)
        .on_state_transition(move |_, _| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    breaker.reset();
    assert_eq!(transitions.load(Ordering::SeqCst), 0);

    let _ = breaker.execute(|| Err::<(), _>(()));
    breaker.reset();
    assert_eq!(transitions.load(Ordering::SeqCst), 2);
}

/// Logging through tracing does not change behavior
#[tokio::test(start_paused = true)]
async fn tracing_subscriber_smoke() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let breaker =
        CircuitBreaker::new(2, Duration::from_millis(500), Duration::from_millis(200)).unwrap();

    let _ = breaker.execute(|| Err::<(), _>("x"));
    advance(Duration::from_secs(1)).await;
    let _ = breaker.execute(|| Err::<(), _>("y"));
    let _ = breaker.execute(|| Err::<(), _>("z"));
    assert!(breaker.is_open());
}
