//! Structured telemetry initialisation for the supervisor.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use camino::Utf8PathBuf;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use kiln_config::{Config, LogFormat};

/// Environment variable holding the log filter directives.
pub const LOG_FILTER_ENV_VAR: &str = "KILN_LOG";
/// Filter used when [`LOG_FILTER_ENV_VAR`] is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Destination for log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetrySink {
    /// Standard error of a foreground process.
    Stderr,
    /// Append-mode log file of a daemon.
    File(Utf8PathBuf),
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log file.
    #[error("failed to open log file '{path}': {source}")]
    LogFile {
        /// Log file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent. Nothing is installed when logging has been
/// switched off.
pub fn initialise(config: &Config, sink: &TelemetrySink) -> Result<TelemetryHandle, TelemetryError> {
    if !config.logging {
        return Ok(TelemetryHandle);
    }
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config, sink))
        .map(|_| TelemetryHandle)
}

fn filter_directives() -> String {
    std::env::var(LOG_FILTER_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned())
}

fn make_writer(sink: &TelemetrySink) -> Result<(BoxMakeWriter, bool), TelemetryError> {
    match sink {
        TelemetrySink::Stderr => Ok((BoxMakeWriter::new(io::stderr), io::stderr().is_terminal())),
        TelemetrySink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Ok((BoxMakeWriter::new(Arc::new(file)), false))
        }
    }
}

fn install_subscriber(config: &Config, sink: &TelemetrySink) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(filter_directives())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let (writer, ansi) = make_writer(sink)?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn silenced_configuration_installs_nothing() {
        let config = Config {
            logging: false,
            ..Config::default()
        };
        initialise(&config, &TelemetrySink::Stderr).expect("silence never fails");
        assert!(TELEMETRY_GUARD.get().is_none());
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing/app.log"))
            .expect("utf-8 temp path");
        let error = make_writer(&TelemetrySink::File(path)).expect_err("directory is missing");
        assert!(matches!(error, TelemetryError::LogFile { .. }));
    }
}
