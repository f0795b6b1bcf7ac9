//! Locating and starting the backend that serves traffic.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod builtin;
mod manifest;
mod resolve;

pub use manifest::{
    BACKEND_ENV_VAR, BackendManifest, HOST_ENV_VAR, LOG_PATH_ENV_VAR, LOGGING_ENV_VAR,
    ManifestError, PORT_ENV_VAR, exported_environment,
};
pub use resolve::{
    BackendEntry, CONFIG_DIRECTORY, MANIFEST_EXTENSION, ResolveError, candidates, resolve_backend,
};

pub(crate) const BACKEND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::backend");

/// Errors raised while loading or running a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Replacing the process image failed.
    #[error("failed to execute backend command '{command}' from '{manifest}': {source}")]
    Exec {
        /// Command named by the manifest.
        command: String,
        /// Manifest path.
        manifest: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The built-in backend could not bind its listener.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Requested `host:port`.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Shutdown signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signal {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
