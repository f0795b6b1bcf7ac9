//! One-shot reactor timers with callback and suspend/resume completion.
//!
//! Each [`Timeout`] is a session holding at most one outstanding timer. A
//! registration number identifies that timer: restarting or cancelling the
//! session bumps the number, so a stale timer that still wakes up finds a
//! mismatch and does nothing. This is what keeps resumption exactly-once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::REACTOR_TARGET;
use crate::reactor::ReactorHandle;

type Listener = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct Session {
    registration: u64,
    pending: bool,
    timer: Option<JoinHandle<()>>,
    listeners: Vec<Listener>,
    resumer: Option<oneshot::Sender<bool>>,
}

impl Session {
    fn invalidate(&mut self) {
        self.registration = self.registration.wrapping_add(1);
        self.pending = false;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// A reactor timer session.
///
/// Dropping the session cancels any outstanding timer, so an abandoned
/// session never resumes anything.
pub struct Timeout {
    interval: Duration,
    reactor: ReactorHandle,
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for Timeout {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Timeout")
            .field("interval", &self.interval)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Timeout {
    /// Creates an idle session that will time out `interval` after each
    /// [`Timeout::start`].
    #[must_use]
    pub fn new(reactor: ReactorHandle, interval: Duration) -> Self {
        Self {
            interval,
            reactor,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// Delay between registration and expiry.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` while a registered timer has not yet fired.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.session).pending
    }

    /// Subscribes `listener` to the session's timeout event.
    ///
    /// Listeners run on the reactor thread each time a registration elapses.
    pub fn on_timeout<F>(&self, listener: F)
    where
        F: FnMut() + Send + 'static,
    {
        lock(&self.session).listeners.push(Box::new(listener));
    }

    /// Registers a one-shot timer with the reactor.
    ///
    /// Only one timer is outstanding per session; calling `start` again
    /// replaces the previous registration.
    pub fn start(&self) {
        let mut session = lock(&self.session);
        session.invalidate();
        session.pending = true;
        let registration = session.registration;
        let interval = self.interval;
        let shared = Arc::clone(&self.session);
        session.timer = Some(self.reactor.spawn(async move {
            tokio::time::sleep(interval).await;
            fire(&shared, registration);
        }));
        trace!(
            target: REACTOR_TARGET,
            registration,
            interval_ms = interval.as_millis(),
            "timeout registered"
        );
    }

    /// Starts the timer and suspends the calling task until it fires.
    ///
    /// Resolves to `true` once the timer has elapsed, or `false` when the
    /// session is cancelled (or restarted by another `sync`) first. The
    /// reactor keeps servicing other work while the caller is suspended.
    pub async fn sync(&self) -> bool {
        let (resumer, resumed) = oneshot::channel();
        lock(&self.session).resumer = Some(resumer);
        self.start();
        resumed.await.unwrap_or(false)
    }

    /// Cancels the outstanding timer, if any.
    ///
    /// A suspended [`Timeout::sync`] resolves to `false`; listeners are not
    /// invoked. Returns `true` when a timer was pending.
    pub fn cancel(&self) -> bool {
        let (was_pending, resumer) = {
            let mut session = lock(&self.session);
            let was_pending = session.pending;
            session.invalidate();
            (was_pending, session.resumer.take())
        };
        if let Some(resumer) = resumer {
            // The receiver may already be gone; nobody is left to resume.
            let _ = resumer.send(false);
        }
        if was_pending {
            trace!(target: REACTOR_TARGET, "timeout cancelled");
        }
        was_pending
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn fire(shared: &Mutex<Session>, registration: u64) {
    let (mut listeners, resumer) = {
        let mut session = lock(shared);
        if session.registration != registration || !session.pending {
            return;
        }
        session.pending = false;
        session.timer = None;
        (
            std::mem::take(&mut session.listeners),
            session.resumer.take(),
        )
    };

    trace!(target: REACTOR_TARGET, registration, "timeout fired");
    for listener in &mut listeners {
        listener();
    }

    {
        let mut session = lock(shared);
        // Keep subscriptions added by listeners after the existing ones.
        listeners.append(&mut session.listeners);
        session.listeners = listeners;
    }

    if let Some(resumer) = resumer {
        let _ = resumer.send(true);
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
