//! Test doubles for lifecycle behaviours and process primitives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use kiln_config::Config;
use nix::errno::Errno;
use nix::sys::stat::Mode;

use crate::action::{Lifecycle, Outcome};
use crate::process::{DaemonizeError, ForkOutcome, LaunchError, ProcessOps, StreamPlan};

/// Pid reported by [`FakeProcessOps::current_pid`].
pub(super) const FAKE_PID: u32 = 4242;

/// Lifecycle that records which behaviour ran and with which configuration.
#[derive(Default)]
pub(super) struct RecordingLifecycle {
    pub calls: Vec<(&'static str, Config)>,
    pub failure: Option<fn() -> LaunchError>,
}

impl RecordingLifecycle {
    pub(super) fn failing(failure: fn() -> LaunchError) -> Self {
        Self {
            calls: Vec::new(),
            failure: Some(failure),
        }
    }

    pub(super) fn names(&self) -> Vec<&'static str> {
        self.calls.iter().map(|(name, _)| *name).collect()
    }

    fn record(&mut self, name: &'static str, config: &Config) -> Result<Outcome, LaunchError> {
        self.calls.push((name, config.clone()));
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(Outcome::Completed),
        }
    }
}

impl Lifecycle for RecordingLifecycle {
    fn start_server(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        self.record("start_server", config)
    }

    fn daemonize_server(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        self.record("daemonize_server", config)
    }

    fn start_console(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        self.record("start_console", config)
    }
}

/// One primitive invoked on [`FakeProcessOps`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ProcessCall {
    Fork,
    NewSession,
    RebindStreams(StreamPlan),
    SetUmask(Mode),
}

/// Process primitives that record calls instead of touching the process.
///
/// Forks answer from a scripted queue and report the child side once the
/// queue runs dry.
#[derive(Clone, Default)]
pub(super) struct FakeProcessOps {
    calls: Arc<Mutex<Vec<ProcessCall>>>,
    forks: Arc<Mutex<VecDeque<ForkOutcome>>>,
    fail_session: bool,
}

impl FakeProcessOps {
    pub(super) fn with_forks(forks: impl IntoIterator<Item = ForkOutcome>) -> Self {
        Self {
            forks: Arc::new(Mutex::new(forks.into_iter().collect())),
            ..Self::default()
        }
    }

    pub(super) fn failing_session() -> Self {
        Self {
            fail_session: true,
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<ProcessCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, call: ProcessCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl ProcessOps for FakeProcessOps {
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError> {
        self.push(ProcessCall::Fork);
        let next = self
            .forks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(next.unwrap_or(ForkOutcome::Child))
    }

    fn new_session(&self) -> Result<(), DaemonizeError> {
        self.push(ProcessCall::NewSession);
        if self.fail_session {
            return Err(DaemonizeError::Os {
                operation: "setsid",
                source: Errno::EPERM,
            });
        }
        Ok(())
    }

    fn current_pid(&self) -> u32 {
        FAKE_PID
    }

    fn rebind_streams(&self, plan: &StreamPlan) -> Result<(), DaemonizeError> {
        self.push(ProcessCall::RebindStreams(plan.clone()));
        Ok(())
    }

    fn set_umask(&self, mask: Mode) {
        self.push(ProcessCall::SetUmask(mask));
    }
}
