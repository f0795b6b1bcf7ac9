//! Operating-system primitives used by the daemoniser.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, dup2, fork, setsid};

use super::NULL_DEVICE;
use super::errors::DaemonizeError;
use super::streams::{StderrTarget, StreamPlan};

/// Which side of a fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    /// The calling process; `child` is the new process id.
    Parent {
        /// Process id of the child.
        child: u32,
    },
    /// The newly created process.
    Child,
}

/// Abstraction over the process primitives daemonisation relies on.
pub trait ProcessOps {
    /// Duplicates the calling process.
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError>;
    /// Starts a new session with the caller as leader.
    fn new_session(&self) -> Result<(), DaemonizeError>;
    /// Identifier of the calling process.
    fn current_pid(&self) -> u32;
    /// Points the three standard streams at the planned targets.
    fn rebind_streams(&self, plan: &StreamPlan) -> Result<(), DaemonizeError>;
    /// Replaces the file creation mask.
    fn set_umask(&self, mask: Mode);
}

/// [`ProcessOps`] backed by the real system calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessOps;

impl ProcessOps for SystemProcessOps {
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError> {
        // Buffered output would otherwise be written twice.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        // SAFETY: forking happens before the reactor or the telemetry
        // subscriber start, so the process has a single thread.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => Ok(ForkOutcome::Parent {
                child: child.as_raw().unsigned_abs(),
            }),
            Ok(ForkResult::Child) => Ok(ForkOutcome::Child),
            Err(source) => Err(DaemonizeError::Os {
                operation: "fork",
                source,
            }),
        }
    }

    fn new_session(&self) -> Result<(), DaemonizeError> {
        setsid().map(drop).map_err(|source| DaemonizeError::Os {
            operation: "setsid",
            source,
        })
    }

    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn rebind_streams(&self, plan: &StreamPlan) -> Result<(), DaemonizeError> {
        let stdin_fd = io::stdin().as_raw_fd();
        let stdout_fd = io::stdout().as_raw_fd();
        let stderr_fd = io::stderr().as_raw_fd();

        let null = open_target("stdin", Path::new(NULL_DEVICE), false)?;
        redirect(&null, stdin_fd)?;

        let stdout = open_target("stdout", plan.stdout_target(), true)?;
        redirect(&stdout, stdout_fd)?;

        match plan.stderr() {
            StderrTarget::AliasStdout => redirect(&stdout, stderr_fd),
            StderrTarget::File(path) => redirect(&open_target("stderr", path, true)?, stderr_fd),
            StderrTarget::Null => {
                redirect(&open_target("stderr", Path::new(NULL_DEVICE), true)?, stderr_fd)
            }
        }
    }

    fn set_umask(&self, mask: Mode) {
        umask(mask);
    }
}

fn open_target(stream: &'static str, path: &Path, append: bool) -> Result<File, DaemonizeError> {
    let mut options = OpenOptions::new();
    if append {
        options.create(true).append(true);
    } else {
        options.read(true);
    }
    options
        .open(path)
        .map_err(|source| DaemonizeError::StreamTarget {
            stream,
            path: path.to_path_buf(),
            source,
        })
}

fn redirect(file: &File, target: RawFd) -> Result<(), DaemonizeError> {
    dup2(file.as_raw_fd(), target)
        .map(drop)
        .map_err(|source| DaemonizeError::Os {
            operation: "dup2",
            source,
        })
}
