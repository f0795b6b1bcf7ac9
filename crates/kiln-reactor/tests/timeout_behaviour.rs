//! Behaviour of the timeout bridge against a live reactor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kiln_reactor::{Reactor, Timeout};
use rstest::{fixture, rstest};

const SETTLE: Duration = Duration::from_millis(60);

#[fixture]
fn reactor() -> Reactor {
    Reactor::new().expect("reactor should start")
}

fn counting_listener(timeout: &Timeout) -> Arc<AtomicUsize> {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    timeout.on_timeout(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    fired
}

#[rstest]
fn sync_resumes_after_interval(reactor: Reactor) {
    let interval = Duration::from_millis(30);
    let timeout = Timeout::new(reactor.handle(), interval);
    let started = Instant::now();

    let resumed = reactor.block_on(timeout.sync());

    assert!(resumed, "sync should resume with true");
    assert!(started.elapsed() >= interval, "resumed before the interval");
    assert!(!timeout.is_pending());
}

#[rstest]
fn zero_interval_returns_promptly(reactor: Reactor) {
    let timeout = Timeout::new(reactor.handle(), Duration::ZERO);
    let started = Instant::now();

    assert!(reactor.block_on(timeout.sync()));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[rstest]
fn sessions_resume_in_expiry_order(reactor: Reactor) {
    let order = Arc::new(Mutex::new(Vec::new()));
    let slow = Timeout::new(reactor.handle(), Duration::from_millis(50));
    let fast = Timeout::new(reactor.handle(), Duration::from_millis(10));
    for (label, timeout) in [("slow", &slow), ("fast", &fast)] {
        let log = Arc::clone(&order);
        timeout.on_timeout(move || {
            log.lock().expect("order log poisoned").push(label);
        });
    }

    let (slow_resumed, fast_resumed) =
        reactor.block_on(async { tokio::join!(slow.sync(), fast.sync()) });

    assert!(slow_resumed && fast_resumed);
    assert_eq!(
        order.lock().expect("order log poisoned").as_slice(),
        &["fast", "slow"]
    );
}

#[rstest]
fn restarting_honours_only_the_last_registration(reactor: Reactor) {
    let timeout = Timeout::new(reactor.handle(), Duration::from_millis(10));
    let fired = counting_listener(&timeout);

    reactor.block_on(async {
        timeout.start();
        timeout.start();
        tokio::time::sleep(SETTLE).await;
    });

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[rstest]
fn callbacks_fire_once_per_start(reactor: Reactor) {
    let timeout = Timeout::new(reactor.handle(), Duration::from_millis(5));
    let fired = counting_listener(&timeout);

    reactor.block_on(async {
        timeout.start();
        tokio::time::sleep(SETTLE).await;
        timeout.start();
        tokio::time::sleep(SETTLE).await;
    });

    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[rstest]
fn cancelled_sync_resolves_false(reactor: Reactor) {
    let timeout = Arc::new(Timeout::new(reactor.handle(), Duration::from_secs(30)));
    let fired = counting_listener(&timeout);
    let canceller = Arc::clone(&timeout);

    let resumed = reactor.block_on(async move {
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel()
        };
        let (resumed, was_pending) = tokio::join!(timeout.sync(), cancel);
        assert!(was_pending, "timer should have been pending at cancellation");
        resumed
    });

    assert!(!resumed, "cancelled session must not report elapsed");
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[rstest]
fn cancelling_idle_session_is_a_no_op(reactor: Reactor) {
    let timeout = Timeout::new(reactor.handle(), Duration::from_millis(5));
    assert!(!timeout.cancel());
}

#[rstest]
fn dropped_session_never_fires(reactor: Reactor) {
    let timeout = Timeout::new(reactor.handle(), Duration::from_millis(5));
    let fired = counting_listener(&timeout);

    reactor.block_on(async move {
        timeout.start();
        drop(timeout);
        tokio::time::sleep(SETTLE).await;
    });

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
