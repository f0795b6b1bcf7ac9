//! Daemon process lifecycle: double-fork detachment, PID file scope, and
//! standard stream rebinding.

use nix::sys::stat::Mode;

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod ops;
pub(crate) mod pid;
pub(crate) mod streams;

pub use daemonizer::{DaemonState, Daemonizer, Detachment, ExitStage};
pub use errors::{DaemonizeError, LaunchError, PidFileError};
pub use ops::{ForkOutcome, ProcessOps, SystemProcessOps};
pub use pid::PidScope;
pub use streams::{StderrTarget, StreamPlan};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// File-creation mask applied once detached: files the daemon creates are
/// readable and writable by group and others.
pub const DAEMON_UMASK: Mode = Mode::empty();

/// Device bound to standard input, and to unset output streams, once detached.
pub const NULL_DEVICE: &str = "/dev/null";
