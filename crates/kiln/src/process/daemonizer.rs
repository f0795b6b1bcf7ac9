//! Drives the double-fork detachment sequence.
//!
//! The sequence mirrors the classic Unix recipe: fork, start a new session,
//! fork again, record the PID, rebind the standard streams, and clear the
//! permission mask. Fork parents do not call `exit` themselves; they receive
//! [`Detachment::Exit`] so the caller can unwind and drop its resources
//! before terminating.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::Write;

use kiln_config::Config;
use tracing::{debug, info};

use super::errors::LaunchError;
use super::ops::{ForkOutcome, ProcessOps};
use super::pid::PidScope;
use super::streams::StreamPlan;
use super::{DAEMON_UMASK, PROCESS_TARGET};

/// Progress of one process through daemonisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Attached to the invoking terminal.
    Foreground,
    /// First child, leading a fresh session.
    SessionLeader,
    /// Second child, unable to reacquire a terminal.
    Forked,
    /// PID recorded and standard streams rebound.
    Detached,
    /// Running the protected body.
    Running,
    /// A step failed; the process must terminate.
    Aborted,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Foreground => "foreground",
            Self::SessionLeader => "session_leader",
            Self::Forked => "forked",
            Self::Detached => "detached",
            Self::Running => "running",
            Self::Aborted => "aborted",
        };
        formatter.write_str(label)
    }
}

/// Fork parent that should terminate once control returns to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStage {
    /// The process that invoked `kiln`.
    Invoker,
    /// The intermediate session leader.
    SessionLeader,
}

/// Result of [`Daemonizer::daemonize`] as seen by the calling process.
#[derive(Debug, PartialEq, Eq)]
pub enum Detachment<T> {
    /// This process is a fork parent and should exit successfully.
    Exit(ExitStage),
    /// This process is the daemon; the body returned `T`.
    Daemon(T),
}

/// Detaches the current process from its terminal.
///
/// A daemoniser performs the sequence at most once; later requests fail with
/// [`LaunchError::AlreadyDaemonized`].
#[derive(Debug)]
pub struct Daemonizer<O> {
    ops: O,
    record: RefCell<Vec<DaemonState>>,
    requested: Cell<bool>,
}

impl<O: ProcessOps> Daemonizer<O> {
    /// Builds a daemoniser over the given process primitives.
    pub const fn new(ops: O) -> Self {
        Self {
            ops,
            record: RefCell::new(Vec::new()),
            requested: Cell::new(false),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DaemonState {
        self.record
            .borrow()
            .last()
            .copied()
            .unwrap_or(DaemonState::Foreground)
    }

    /// Every state entered so far, starting from [`DaemonState::Foreground`].
    pub fn transitions(&self) -> Vec<DaemonState> {
        std::iter::once(DaemonState::Foreground)
            .chain(self.record.borrow().iter().copied())
            .collect()
    }

    /// Detaches and runs `body` inside the surviving process.
    ///
    /// The daemon writes its PID to `announce` once the PID file exists and
    /// before the standard streams are rebound. The PID file is removed when
    /// `body` returns.
    pub fn daemonize<W, T, F>(
        &self,
        config: &Config,
        announce: &mut W,
        body: F,
    ) -> Result<Detachment<T>, LaunchError>
    where
        W: Write,
        F: FnOnce(&Config) -> Result<T, LaunchError>,
    {
        if self.requested.replace(true) {
            return Err(LaunchError::AlreadyDaemonized);
        }
        let result = self.detach(config, announce, body);
        if result.is_err() {
            self.transition(DaemonState::Aborted);
        }
        result
    }

    fn detach<W, T, F>(
        &self,
        config: &Config,
        announce: &mut W,
        body: F,
    ) -> Result<Detachment<T>, LaunchError>
    where
        W: Write,
        F: FnOnce(&Config) -> Result<T, LaunchError>,
    {
        info!(
            target: PROCESS_TARGET,
            backend = %config.backend,
            "daemonising into background"
        );
        if let ForkOutcome::Parent { child } = self.ops.fork()? {
            debug!(target: PROCESS_TARGET, child, "invoker handing off to session leader");
            return Ok(Detachment::Exit(ExitStage::Invoker));
        }
        self.ops.new_session()?;
        self.transition(DaemonState::SessionLeader);

        if let ForkOutcome::Parent { child } = self.ops.fork()? {
            debug!(target: PROCESS_TARGET, child, "session leader handing off to daemon");
            return Ok(Detachment::Exit(ExitStage::SessionLeader));
        }
        self.transition(DaemonState::Forked);

        let pid = self.ops.current_pid();
        let scope = PidScope::acquire(config.pid_path(), pid)?;
        // The invoker may already be gone; the PID file is authoritative.
        let _ = writeln!(announce, "{pid}").and_then(|()| announce.flush());

        self.ops.rebind_streams(&StreamPlan::from_config(config))?;
        self.transition(DaemonState::Detached);
        self.ops.set_umask(DAEMON_UMASK);

        self.transition(DaemonState::Running);
        let outcome = body(config);
        drop(scope);
        outcome.map(Detachment::Daemon)
    }

    fn transition(&self, next: DaemonState) {
        let previous = self.state();
        self.record.borrow_mut().push(next);
        debug!(
            target: PROCESS_TARGET,
            from = %previous,
            to = %next,
            "daemon state transition"
        );
    }
}
