//! Standard stream targets for a detached process.

use std::path::{Path, PathBuf};

use kiln_config::Config;

use super::NULL_DEVICE;

/// Where standard error ends up once the process is detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrTarget {
    /// Share the standard output descriptor.
    AliasStdout,
    /// Append to a dedicated file.
    File(PathBuf),
    /// Discard everything.
    Null,
}

/// Rebinding plan for the three standard streams.
///
/// Standard input always reads from the null device. Standard output appends
/// to a file or discards. Standard error follows [`StderrTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    stdout: Option<PathBuf>,
    stderr: StderrTarget,
}

impl StreamPlan {
    /// Derives the plan from the configured stream paths.
    ///
    /// A standard error path equal to the standard output path shares the
    /// descriptor rather than opening the file a second time.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let stdout = config.stdout_path().map(|path| path.as_std_path().to_path_buf());
        let stderr = match config.stderr_path() {
            Some(path) if stdout.as_deref() == Some(path.as_std_path()) => {
                StderrTarget::AliasStdout
            }
            Some(path) => StderrTarget::File(path.as_std_path().to_path_buf()),
            None => StderrTarget::Null,
        };
        Self { stdout, stderr }
    }

    /// File receiving standard output, if any.
    #[must_use]
    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }

    /// Destination for standard error.
    #[must_use]
    pub const fn stderr(&self) -> &StderrTarget {
        &self.stderr
    }

    /// Path standard output is opened on, falling back to the null device.
    #[must_use]
    pub fn stdout_target(&self) -> &Path {
        self.stdout().unwrap_or_else(|| Path::new(NULL_DEVICE))
    }
}
