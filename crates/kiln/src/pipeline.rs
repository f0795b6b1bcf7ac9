//! Ordered configuration pipeline run before any action executes.
//!
//! Each step mutates the shared [`ParseContext`] in turn. Steps cannot skip
//! one another and run exactly once per [`ParsePipeline::run`]; the first
//! failure stops the run.

use std::ffi::OsString;

use kiln_config::{Config, EnvironmentSource, FRAMEWORK_ENV_VAR, Privilege, resolve_environment};
use thiserror::Error;
use tracing::debug;

use crate::action::Action;
use crate::cli::{CliError, CommandLine};

pub(crate) const PIPELINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pipeline");

/// Mutable state threaded through the pipeline.
pub struct ParseContext<'a> {
    /// Configuration under construction.
    pub config: Config,
    /// Action selected so far.
    pub action: Action,
    arguments: Vec<OsString>,
    environment: &'a mut dyn EnvironmentSource,
    privilege: Privilege,
}

impl<'a> ParseContext<'a> {
    /// Starts from the built-in configuration and the default action.
    ///
    /// `arguments` includes the program name in first position.
    pub fn new<I, T>(
        arguments: I,
        environment: &'a mut dyn EnvironmentSource,
        privilege: Privilege,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            config: Config::default(),
            action: Action::default(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            environment,
            privilege,
        }
    }

    /// Command-line arguments, program name first.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.arguments
    }

    /// Environment the pipeline reads and writes.
    pub fn environment(&mut self) -> &mut dyn EnvironmentSource {
        &mut *self.environment
    }

    /// Privilege used by the defaults step.
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Final configuration and action.
    #[must_use]
    pub fn into_parts(self) -> (Config, Action) {
        (self.config, self.action)
    }
}

/// Failure raised by a single step.
#[derive(Debug, Error)]
pub enum StepError {
    /// Command-line flags were malformed.
    #[error(transparent)]
    Flags(#[from] CliError),
    /// Any other failure reported by a custom step.
    #[error("{0}")]
    Other(String),
}

/// Failure of the pipeline as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The named step failed.
    #[error("{source}")]
    Step {
        /// Name of the failing step.
        step: &'static str,
        /// Underlying step error.
        #[source]
        source: StepError,
    },
}

/// One configuration-mutation step.
pub trait ParseStep {
    /// Name reported in diagnostics.
    fn name(&self) -> &'static str;
    /// Applies the step to `context`.
    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError>;
}

struct FnStep<F> {
    name: &'static str,
    apply: F,
}

impl<F> ParseStep for FnStep<F>
where
    F: Fn(&mut ParseContext<'_>) -> Result<(), StepError>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError> {
        (self.apply)(context)
    }
}

/// Ordered list of parse steps.
#[derive(Default)]
pub struct ParsePipeline {
    steps: Vec<Box<dyn ParseStep>>,
}

impl ParsePipeline {
    /// Creates a pipeline with no steps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The four fixed steps: environment, flags, defaults, and environment
    /// propagation.
    #[must_use]
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(EnvironmentStep);
        pipeline.register(FlagsStep);
        pipeline.register(DefaultsStep);
        pipeline.register(PropagateEnvironmentStep);
        pipeline
    }

    /// Appends `step` after every registered step.
    pub fn register<S: ParseStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends a closure as a named step.
    pub fn register_fn<F>(&mut self, name: &'static str, apply: F) -> &mut Self
    where
        F: Fn(&mut ParseContext<'_>) -> Result<(), StepError> + 'static,
    {
        self.register(FnStep { name, apply })
    }

    /// Names of the registered steps in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs every step once, in registration order.
    pub fn run(&self, context: &mut ParseContext<'_>) -> Result<(), PipelineError> {
        for step in &self.steps {
            let name = step.name();
            debug!(target: PIPELINE_TARGET, step = name, "running parse step");
            step.apply(context)
                .map_err(|source| PipelineError::Step { step: name, source })?;
        }
        debug!(
            target: PIPELINE_TARGET,
            action = %context.action,
            environment = %context.config.environment,
            backend = %context.config.backend,
            "parse pipeline complete"
        );
        Ok(())
    }
}

/// Selects the environment from process environment variables.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentStep;

impl ParseStep for EnvironmentStep {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError> {
        let environment = resolve_environment(context.environment());
        debug!(target: PIPELINE_TARGET, %environment, "environment resolved");
        context.config.environment = environment;
        Ok(())
    }
}

/// Applies command-line overrides and the selected action.
#[derive(Debug, Clone, Copy)]
pub struct FlagsStep;

impl ParseStep for FlagsStep {
    fn name(&self) -> &'static str {
        "flags"
    }

    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError> {
        let command_line = CommandLine::parse(context.arguments().iter().cloned())?;
        command_line.apply(&mut context.config);
        if let Some(action) = command_line.action {
            context.action = action;
        }
        debug!(target: PIPELINE_TARGET, action = %context.action, "flags applied");
        Ok(())
    }
}

/// Fills computed defaults.
#[derive(Debug, Clone, Copy)]
pub struct DefaultsStep;

impl ParseStep for DefaultsStep {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError> {
        let privilege = context.privilege();
        context.config.apply_defaults(privilege);
        debug!(
            target: PIPELINE_TARGET,
            superuser = privilege.is_superuser(),
            "defaults applied"
        );
        Ok(())
    }
}

/// Publishes the resolved environment for collaborating code.
#[derive(Debug, Clone, Copy)]
pub struct PropagateEnvironmentStep;

impl ParseStep for PropagateEnvironmentStep {
    fn name(&self) -> &'static str {
        "propagate-environment"
    }

    fn apply(&self, context: &mut ParseContext<'_>) -> Result<(), StepError> {
        let environment = context.config.environment.clone();
        context
            .environment()
            .set_var(FRAMEWORK_ENV_VAR, &environment);
        debug!(
            target: PIPELINE_TARGET,
            variable = FRAMEWORK_ENV_VAR,
            %environment,
            "environment propagated"
        );
        Ok(())
    }
}
