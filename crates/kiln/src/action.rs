//! Maps the selected action onto exactly one lifecycle behaviour.

use std::fmt;
use std::io::{self, Write};

use kiln_config::Config;
use thiserror::Error;

use crate::cli::help_text;
use crate::process::LaunchError;

/// Lifecycle behaviour chosen for one invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    /// Run the backend in the foreground.
    #[default]
    StartServer,
    /// Detach, then run the backend.
    DaemonizeServer,
    /// Print the resolved configuration.
    ShowConfiguration,
    /// Open the debug console.
    StartConsole,
    /// Print the option reference.
    DisplayHelp,
    /// Print the version.
    DisplayVersion,
}

impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartServer => "start_server",
            Self::DaemonizeServer => "daemonize_server",
            Self::ShowConfiguration => "show_configuration",
            Self::StartConsole => "start_console",
            Self::DisplayHelp => "display_help",
            Self::DisplayVersion => "display_version",
        };
        formatter.write_str(name)
    }
}

/// How control came back from a lifecycle behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The behaviour ran to completion in this process.
    Completed,
    /// This process is a fork parent left behind by daemonisation.
    Detached,
}

/// Behaviours that leave the dispatcher's process-local world.
pub trait Lifecycle {
    /// Resolves and runs the backend in the foreground.
    fn start_server(&mut self, config: &Config) -> Result<Outcome, LaunchError>;
    /// Detaches from the terminal, then runs the backend.
    fn daemonize_server(&mut self, config: &Config) -> Result<Outcome, LaunchError>;
    /// Runs the debug console on the reactor.
    fn start_console(&mut self, config: &Config) -> Result<Outcome, LaunchError>;
}

/// Errors raised while dispatching an action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A lifecycle behaviour failed.
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

/// Runs the behaviour selected by `action`.
pub fn dispatch<L, W>(
    action: Action,
    config: &Config,
    lifecycle: &mut L,
    output: &mut W,
) -> Result<Outcome, DispatchError>
where
    L: Lifecycle + ?Sized,
    W: Write,
{
    match action {
        Action::StartServer => Ok(lifecycle.start_server(config)?),
        Action::DaemonizeServer => Ok(lifecycle.daemonize_server(config)?),
        Action::StartConsole => Ok(lifecycle.start_console(config)?),
        Action::ShowConfiguration => {
            config.render(output).map_err(DispatchError::Output)?;
            Ok(Outcome::Completed)
        }
        Action::DisplayHelp => {
            write!(output, "{}", help_text())
                .and_then(|()| output.flush())
                .map_err(DispatchError::Output)?;
            Ok(Outcome::Completed)
        }
        Action::DisplayVersion => {
            writeln!(output, "{}", version_line())
                .and_then(|()| output.flush())
                .map_err(DispatchError::Output)?;
            Ok(Outcome::Completed)
        }
    }
}

/// Text printed for `--version`.
#[must_use]
pub fn version_line() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
