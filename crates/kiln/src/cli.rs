//! Command-line flags for the `kiln` supervisor.
//!
//! Action flags are mutually exclusive in effect: when several are given the
//! one appearing last on the command line selects the action.

use std::ffi::OsString;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use kiln_config::{Config, DEFAULT_BACKEND};
use thiserror::Error;

use crate::action::Action;

/// Raw flag set accepted by `kiln`.
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    override_usage = "kiln [options]",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
pub(crate) struct Cli {
    /// Specifies the execution environment
    #[arg(short, long, value_name = "ENV")]
    pub(crate) environment: Option<String>,
    /// Runs the backend on the specified port
    #[arg(short, long, value_name = "PORT")]
    pub(crate) port: Option<u16>,
    /// Binds the backend to the specified host
    #[arg(short = 'a', long, value_name = "HOST")]
    pub(crate) address: Option<String>,
    /// Selects the backend entry point
    #[arg(
        short,
        long,
        value_name = "NAME",
        num_args = 0..=1,
        default_missing_value = DEFAULT_BACKEND
    )]
    pub(crate) backend: Option<String>,
    /// Runs the server in the background
    #[arg(short, long)]
    pub(crate) daemonize: bool,
    /// Disables logging
    #[arg(short, long)]
    pub(crate) silence: bool,
    /// Shows the server configuration
    #[arg(short, long)]
    pub(crate) info: bool,
    /// Starts an interactive console
    #[arg(short, long)]
    pub(crate) console: bool,
    /// Shows this message
    #[arg(short, long)]
    pub(crate) help: bool,
    /// Shows the version
    #[arg(short = 'v', long)]
    pub(crate) version: bool,
}

const ACTION_FLAGS: &[(&str, Action)] = &[
    ("daemonize", Action::DaemonizeServer),
    ("info", Action::ShowConfiguration),
    ("console", Action::StartConsole),
    ("help", Action::DisplayHelp),
    ("version", Action::DisplayVersion),
];

/// Malformed command-line input.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CliError(#[from] clap::Error);

/// Flags extracted from one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Environment override.
    pub environment: Option<String>,
    /// Port override.
    pub port: Option<u16>,
    /// Host override.
    pub address: Option<String>,
    /// Backend override.
    pub backend: Option<String>,
    /// Whether logging was switched off.
    pub silence: bool,
    /// Action selected by the last action flag, if any.
    pub action: Option<Action>,
}

impl CommandLine {
    /// Parses `args`, where the first element is the program name.
    pub fn parse<I, T>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Cli::command().try_get_matches_from(args)?;
        let cli = Cli::from_arg_matches(&matches)?;
        Ok(Self {
            environment: cli.environment,
            port: cli.port,
            address: cli.address,
            backend: cli.backend,
            silence: cli.silence,
            action: last_action(&matches),
        })
    }

    /// Writes the overrides into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(environment) = &self.environment {
            config.environment.clone_from(environment);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = &self.address {
            config.host.clone_from(address);
        }
        if let Some(backend) = &self.backend {
            config.backend.clone_from(backend);
        }
        if self.silence {
            config.logging = false;
        }
    }
}

fn last_action(matches: &ArgMatches) -> Option<Action> {
    ACTION_FLAGS
        .iter()
        .filter(|(id, _)| matches.value_source(id) == Some(ValueSource::CommandLine))
        .filter_map(|(id, action)| {
            matches
                .indices_of(id)
                .and_then(Iterator::max)
                .map(|index| (index, *action))
        })
        .max_by_key(|(index, _)| *index)
        .map(|(_, action)| action)
}

/// Full option reference printed by `--help`.
#[must_use]
pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}
