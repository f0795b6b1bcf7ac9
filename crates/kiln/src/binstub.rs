//! Hands control to a project-local `bin/kiln` when one exists.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_config::EnvironmentSource;
use thiserror::Error;
use tracing::info;

const BINSTUB_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::binstub");

/// Set in the environment of an exec'd binstub so it does not redirect again.
pub const BINSTUB_ENV_VAR: &str = "KILN_BINSTUB";

/// Location of the binstub relative to the working directory.
pub const BINSTUB_PATH: &str = "bin/kiln";

/// Failure to hand control to the binstub.
#[derive(Debug, Error)]
#[error("failed to execute binstub '{path}': {source}")]
pub struct BinstubError {
    /// Binstub path.
    pub path: PathBuf,
    /// Underlying IO error.
    #[source]
    pub source: io::Error,
}

/// Returns the binstub to run instead of this executable, if any.
///
/// The binstub is skipped when it is not a regular file, when it is the
/// running executable, or when an earlier redirect already happened.
pub fn locate(
    cwd: &Path,
    current_exe: Option<&Path>,
    environment: &dyn EnvironmentSource,
) -> Option<PathBuf> {
    if environment.var(BINSTUB_ENV_VAR).is_some() {
        return None;
    }
    let candidate = cwd.join(BINSTUB_PATH);
    if !candidate.is_file() {
        return None;
    }
    let canonical = fs::canonicalize(&candidate).ok()?;
    let running = current_exe.and_then(|exe| fs::canonicalize(exe).ok());
    if running.as_deref() == Some(canonical.as_path()) {
        return None;
    }
    Some(candidate)
}

/// Replaces the process with the binstub, forwarding `args` minus the
/// program name. Only returns on failure.
pub fn exec(path: &Path, args: &[OsString]) -> BinstubError {
    info!(
        target: BINSTUB_TARGET,
        binstub = %path.display(),
        "handing off to project binstub"
    );
    let source = Command::new(path)
        .args(args.iter().skip(1))
        .env(BINSTUB_ENV_VAR, "1")
        .exec();
    BinstubError {
        path: path.to_path_buf(),
        source,
    }
}
