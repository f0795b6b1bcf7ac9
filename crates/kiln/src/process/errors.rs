//! Defines the unified error surface for server launch and daemonisation.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use kiln_reactor::ReactorError;

use crate::backend::{BackendError, ResolveError};
use crate::console::ConsoleError;
use crate::telemetry::TelemetryError;

/// Errors surfaced while launching the server, daemonising, or running the
/// console. Every variant is fatal.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Resolving the working directory failed.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// No backend entry point could be found.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Loading or running the backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A process-level daemonisation step failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
    /// The PID file could not be recorded.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// Daemonisation was requested twice in one invocation.
    #[error("process has already been daemonised")]
    AlreadyDaemonized,
    /// The reactor could not be started.
    #[error(transparent)]
    Reactor(#[from] ReactorError),
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The console session failed.
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

/// Errors raised by the operating-system side of daemonisation.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// A system call failed.
    #[error("{operation} failed: {source}")]
    Os {
        /// Name of the failing operation.
        operation: &'static str,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// A stream target could not be opened.
    #[error("failed to open '{path}' for {stream}: {source}")]
    StreamTarget {
        /// Stream being rebound.
        stream: &'static str,
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised while recording the PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The PID file directory could not be created.
    #[error("failed to prepare pid directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
