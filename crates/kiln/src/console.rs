//! Debug console that evaluates a small command set on the reactor.

use std::io::{self, Write};
use std::time::Duration;

use kiln_config::Config;
use kiln_reactor::{ReactorHandle, Timeout};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// Prompt printed by [`InteractiveConsole`].
pub const PROMPT: &str = "kiln> ";

const COMMANDS: &str = "\
commands:
  config      show the server configuration
  env         show the execution environment
  pid         show the process id
  sleep <ms>  suspend for the given milliseconds
  help        show this message
  exit, quit  leave the console
";

/// Errors raised by a console session.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading input or writing output failed.
    #[error("console I/O failed: {source}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for ConsoleError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}

/// Presentation of a console session.
pub trait Console {
    /// Written once before the first command is read.
    fn greet(&self, config: &Config, output: &mut dyn Write) -> io::Result<()>;
    /// Written before each command is read.
    fn prompt(&self, output: &mut dyn Write) -> io::Result<()>;
}

/// Console for a terminal: banner and prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractiveConsole;

impl Console for InteractiveConsole {
    fn greet(&self, config: &Config, output: &mut dyn Write) -> io::Result<()> {
        writeln!(
            output,
            "{} {} console ({}); type `help` for commands",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            config.environment
        )
    }

    fn prompt(&self, output: &mut dyn Write) -> io::Result<()> {
        write!(output, "{PROMPT}")?;
        output.flush()
    }
}

/// Console for piped input: results only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainConsole;

impl Console for PlainConsole {
    fn greet(&self, _config: &Config, _output: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn prompt(&self, _output: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// Picks the interactive console when standard input is a terminal and falls
/// back to the plain one otherwise.
#[must_use]
pub fn preferred(stdin_is_terminal: bool) -> Box<dyn Console> {
    if stdin_is_terminal {
        Box::new(InteractiveConsole)
    } else {
        Box::new(PlainConsole)
    }
}

/// Reads and evaluates commands until `exit` or end of input.
pub async fn run<R, W>(
    console: &dyn Console,
    config: &Config,
    reactor: ReactorHandle,
    input: R,
    output: &mut W,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.greet(config, output)?;
    let mut lines = input.lines();
    loop {
        console.prompt(output)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        debug!(target: CONSOLE_TARGET, command, "evaluating console command");
        match command {
            "exit" | "quit" => break,
            "config" => config.render(output)?,
            "env" => writeln!(output, "{}", config.environment)?,
            "pid" => writeln!(output, "{}", std::process::id())?,
            "help" => write!(output, "{COMMANDS}")?,
            "sleep" => match words.next().map(str::parse::<u64>) {
                Some(Ok(millis)) => {
                    let timer = Timeout::new(reactor.clone(), Duration::from_millis(millis));
                    if timer.sync().await {
                        writeln!(output, "slept {millis}ms")?;
                    }
                }
                _ => writeln!(output, "usage: sleep <ms>")?,
            },
            other => writeln!(output, "unknown command: {other}")?,
        }
        output.flush()?;
    }
    output.flush()?;
    Ok(())
}
