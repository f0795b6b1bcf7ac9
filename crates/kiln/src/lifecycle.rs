//! Production implementation of the lifecycle behaviours.

use std::env;
use std::io::{self, IsTerminal};

use kiln_config::Config;
use kiln_reactor::Reactor;
use tokio::io::BufReader;
use tracing::info;

use crate::action::{Lifecycle, Outcome};
use crate::backend::{self, BackendEntry, BackendError, BackendManifest, resolve_backend};
use crate::console;
use crate::process::{Daemonizer, Detachment, LaunchError, ProcessOps, SystemProcessOps};
use crate::telemetry::{self, TelemetrySink};

/// Runs behaviours against the real process, filesystem, and terminal.
#[derive(Debug)]
pub struct SystemLifecycle<O = SystemProcessOps> {
    daemonizer: Daemonizer<O>,
}

impl SystemLifecycle {
    /// Builds a lifecycle backed by the real system calls.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_ops(SystemProcessOps)
    }
}

impl Default for SystemLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ProcessOps> SystemLifecycle<O> {
    /// Builds a lifecycle over custom process primitives.
    pub const fn with_ops(ops: O) -> Self {
        Self {
            daemonizer: Daemonizer::new(ops),
        }
    }
}

impl<O: ProcessOps> Lifecycle for SystemLifecycle<O> {
    fn start_server(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        telemetry::initialise(config, &TelemetrySink::Stderr)?;
        serve(config)?;
        Ok(Outcome::Completed)
    }

    fn daemonize_server(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        let detachment = self
            .daemonizer
            .daemonize(config, &mut io::stdout(), |config| {
                telemetry::initialise(config, &TelemetrySink::File(config.log_path()))?;
                serve(config)
            })?;
        match detachment {
            Detachment::Exit(_) => Ok(Outcome::Detached),
            Detachment::Daemon(()) => Ok(Outcome::Completed),
        }
    }

    fn start_console(&mut self, config: &Config) -> Result<Outcome, LaunchError> {
        telemetry::initialise(config, &TelemetrySink::Stderr)?;
        let reactor = Reactor::new()?;
        let frontend = console::preferred(io::stdin().is_terminal());
        let input = BufReader::new(tokio::io::stdin());
        let mut output = io::stdout();
        reactor.block_on(console::run(
            frontend.as_ref(),
            config,
            reactor.handle(),
            input,
            &mut output,
        ))?;
        Ok(Outcome::Completed)
    }
}

/// Resolves the configured backend and runs it in this process.
///
/// Manifest backends replace the process image, so this only returns for the
/// built-in backend or on failure.
pub fn serve(config: &Config) -> Result<(), LaunchError> {
    let cwd = env::current_dir().map_err(|source| LaunchError::WorkingDirectory { source })?;
    match resolve_backend(&cwd, &config.backend)? {
        BackendEntry::Manifest(path) => {
            info!(
                target: backend::BACKEND_TARGET,
                manifest = %path.display(),
                "loading backend manifest"
            );
            let manifest = BackendManifest::load(&path).map_err(BackendError::from)?;
            let source = manifest.exec(config);
            Err(BackendError::Exec {
                command: manifest.command,
                manifest: path,
                source,
            }
            .into())
        }
        BackendEntry::BuiltIn => {
            let reactor = Reactor::new()?;
            reactor.block_on(backend::builtin::run(config, reactor.handle()))?;
            Ok(())
        }
    }
}
