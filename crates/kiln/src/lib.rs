//! Process supervisor runtime for the `kiln` binary.
//!
//! An invocation flows through three stages. The [`pipeline`] turns process
//! environment variables and command-line flags into a [`Config`] and an
//! [`Action`]. The [`action`] dispatcher then runs exactly one behaviour.
//! Server behaviours locate a backend, optionally detach through the
//! [`process`] daemoniser, and hand over to the backend.

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use kiln_config::{Config, EnvironmentSource, Privilege, ProcessEnvironment};
use thiserror::Error;

pub mod action;
pub mod backend;
pub mod binstub;
pub mod cli;
pub mod console;
pub mod lifecycle;
pub mod pipeline;
pub mod process;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use action::{Action, DispatchError, Lifecycle, Outcome, dispatch};
pub use lifecycle::SystemLifecycle;
pub use pipeline::{ParseContext, ParsePipeline, PipelineError};

/// Fatal errors reported by [`run`].
#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Runs the supervisor with the real process environment.
///
/// A project-local `bin/kiln` takes over before anything else happens.
/// Diagnostics for fatal errors go to `stdout`.
#[must_use]
pub fn run<I, W>(args: I, stdout: &mut W) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let mut environment = ProcessEnvironment;

    if let Ok(cwd) = env::current_dir() {
        let current_exe = env::current_exe().ok();
        if let Some(binstub) = binstub::locate(&cwd, current_exe.as_deref(), &environment) {
            let error = binstub::exec(&binstub, &args);
            let _ = writeln!(stdout, "{error}");
            return ExitCode::FAILURE;
        }
    }

    let mut lifecycle = SystemLifecycle::new();
    run_with(
        args,
        &mut environment,
        Privilege::detect(),
        &mut lifecycle,
        stdout,
    )
}

/// Runs the parse pipeline and dispatches the selected action.
///
/// Every fatal error is written to `stdout` and mapped to
/// [`ExitCode::FAILURE`]. Fork parents left behind by daemonisation exit
/// successfully.
pub fn run_with<I, T, L, W>(
    args: I,
    environment: &mut dyn EnvironmentSource,
    privilege: Privilege,
    lifecycle: &mut L,
    stdout: &mut W,
) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    L: Lifecycle + ?Sized,
    W: Write,
{
    let result = parse(args, environment, privilege)
        .map_err(AppError::from)
        .and_then(|(config, action)| {
            dispatch(action, &config, lifecycle, stdout).map_err(AppError::from)
        });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stdout, "{error}");
            let _ = stdout.flush();
            ExitCode::FAILURE
        }
    }
}

/// Runs the standard parse pipeline over `args`.
pub fn parse<I, T>(
    args: I,
    environment: &mut dyn EnvironmentSource,
    privilege: Privilege,
) -> Result<(Config, Action), PipelineError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut context = ParseContext::new(args, environment, privilege);
    ParsePipeline::standard().run(&mut context)?;
    Ok(context.into_parts())
}
