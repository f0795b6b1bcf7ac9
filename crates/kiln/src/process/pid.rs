//! PID file held for the lifetime of the daemon.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::PidFileError;

/// PID file that exists for as long as the value is alive.
///
/// The file is removed when the scope is dropped, whether the guarded work
/// returned normally or through an error.
#[derive(Debug)]
pub struct PidScope {
    path: PathBuf,
}

impl PidScope {
    /// Creates the parent directory if needed and writes `pid` followed by a
    /// newline to `path`.
    pub fn acquire(path: impl Into<PathBuf>, pid: u32) -> Result<Self, PidFileError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PidFileError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let write_error = |source| PidFileError::Write {
            path: path.clone(),
            source,
        };
        let mut file = options.open(&path).map_err(write_error)?;
        writeln!(file, "{pid}").map_err(write_error)?;
        file.sync_all().map_err(write_error)?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(Self { path })
    }

    /// Location of the PID file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidScope {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}
