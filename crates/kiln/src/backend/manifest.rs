//! Backend manifests: a TOML description of the process that serves traffic.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_config::{Config, ENGINE_ENV_VAR, FRAMEWORK_ENV_VAR};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::BACKEND_TARGET;

/// Variables exported to every manifest command.
pub const HOST_ENV_VAR: &str = "KILN_HOST";
/// Port exported to manifest commands.
pub const PORT_ENV_VAR: &str = "KILN_PORT";
/// Backend identifier exported to manifest commands.
pub const BACKEND_ENV_VAR: &str = "KILN_BACKEND";
/// Log file path exported to manifest commands.
pub const LOG_PATH_ENV_VAR: &str = "KILN_LOG_PATH";
/// Logging switch exported to manifest commands.
pub const LOGGING_ENV_VAR: &str = "KILN_LOGGING";

/// Parsed `<name>.toml` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendManifest {
    /// Program to execute.
    pub command: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment, applied after the exported configuration.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Errors raised while reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("failed to read backend manifest '{path}': {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid manifest.
    #[error("invalid backend manifest '{path}': {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The manifest names an empty command.
    #[error("backend manifest '{path}' has an empty command")]
    EmptyCommand {
        /// Manifest path.
        path: PathBuf,
    },
}

impl BackendManifest {
    /// Reads and validates the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = toml::from_str(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if manifest.command.trim().is_empty() {
            return Err(ManifestError::EmptyCommand {
                path: path.to_path_buf(),
            });
        }
        Ok(manifest)
    }

    /// Builds the command with the configuration exported to its environment.
    #[must_use]
    pub fn command(&self, config: &Config) -> Command {
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        for (key, value) in exported_environment(config) {
            command.env(key, value);
        }
        command.envs(&self.env);
        command
    }

    /// Replaces the current process image with the manifest command.
    ///
    /// Only returns when the exec itself fails.
    pub fn exec(&self, config: &Config) -> io::Error {
        info!(
            target: BACKEND_TARGET,
            command = %self.command,
            args = ?self.args,
            "executing backend"
        );
        self.command(config).exec()
    }
}

/// Configuration values exported to backend processes.
#[must_use]
pub fn exported_environment(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        (ENGINE_ENV_VAR, config.environment.clone()),
        (FRAMEWORK_ENV_VAR, config.environment.clone()),
        (HOST_ENV_VAR, config.host.clone()),
        (PORT_ENV_VAR, config.port.to_string()),
        (BACKEND_ENV_VAR, config.backend.clone()),
        (LOG_PATH_ENV_VAR, config.log_path().into_string()),
        (LOGGING_ENV_VAR, config.logging.to_string()),
    ]
}
