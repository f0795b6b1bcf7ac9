//! Startup configuration shared by the `kiln` supervisor.
//!
//! The [`Config`] record is a plain bag of settings: the execution
//! environment, the bind address, the backend identifier, and the paths used
//! by the daemoniser. It carries no behaviour beyond storage, computed
//! defaults, and rendering. The parse pipeline in the `kiln` crate is its only
//! writer; once the pipeline finishes the record is read-only.

mod defaults;
mod environment;
mod logging;
mod privilege;
mod render;

use camino::{Utf8Path, Utf8PathBuf};

pub use defaults::{
    DEFAULT_BACKEND, DEFAULT_ENVIRONMENT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WORKER_IDENTITY,
    DEVELOPMENT_ENVIRONMENT,
};
pub use environment::{
    ENGINE_ENV_VAR, EnvironmentSource, FRAMEWORK_ENV_VAR, MapEnvironment, ProcessEnvironment,
    resolve_environment,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use privilege::Privilege;
pub use render::{CONFIGURATION_HEADING, UNSET_SENTINEL};

/// Startup settings for one supervisor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Execution environment name, for example `development` or `production`.
    pub environment: String,
    /// Host the backend binds to.
    pub host: String,
    /// Port the backend binds to.
    pub port: u16,
    /// Identifier used to locate the backend entry point.
    pub backend: String,
    /// Whether structured logging is enabled.
    pub logging: bool,
    /// PID file written while daemonised.
    pub pid_path: Option<Utf8PathBuf>,
    /// Log file used by the daemonised process.
    pub log_path: Option<Utf8PathBuf>,
    /// Destination for standard output once daemonised.
    pub stdout_path: Option<Utf8PathBuf>,
    /// Destination for standard error once daemonised.
    pub stderr_path: Option<Utf8PathBuf>,
    /// Account the server should run as.
    pub user: Option<String>,
    /// Group the server should run as.
    pub group: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            backend: DEFAULT_BACKEND.to_owned(),
            logging: true,
            pid_path: None,
            log_path: None,
            stdout_path: None,
            stderr_path: None,
            user: None,
            group: None,
        }
    }
}

impl Config {
    /// Fills unset fields with values computed from the current settings.
    ///
    /// Paths derive from [`Config::backend`] at the time of the call, so a
    /// backend override applied earlier changes the derived file names.
    /// Fields that already hold a value are left untouched, which makes the
    /// operation idempotent.
    pub fn apply_defaults(&mut self, privilege: Privilege) {
        if privilege.is_superuser() {
            self.user
                .get_or_insert_with(|| DEFAULT_WORKER_IDENTITY.to_owned());
            self.group
                .get_or_insert_with(|| DEFAULT_WORKER_IDENTITY.to_owned());
        }

        let pid_path = self.derived_path("pid");
        self.pid_path.get_or_insert(pid_path);
        let log_path = self.derived_path("log");
        self.log_path.get_or_insert(log_path);

        if self.is_development() {
            let stdout_path = self
                .stdout_path
                .get_or_insert_with(|| Utf8PathBuf::from(format!("{}.stdout", self.backend)))
                .clone();
            self.stderr_path.get_or_insert(stdout_path);
        }
    }

    /// PID file path, derived from the backend name when unset.
    #[must_use]
    pub fn pid_path(&self) -> Utf8PathBuf {
        self.pid_path
            .clone()
            .unwrap_or_else(|| self.derived_path("pid"))
    }

    /// Log file path, derived from the backend name when unset.
    #[must_use]
    pub fn log_path(&self) -> Utf8PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.derived_path("log"))
    }

    /// Destination for standard output once daemonised, if any.
    #[must_use]
    pub fn stdout_path(&self) -> Option<&Utf8Path> {
        self.stdout_path.as_deref()
    }

    /// Destination for standard error once daemonised, if any.
    #[must_use]
    pub fn stderr_path(&self) -> Option<&Utf8Path> {
        self.stderr_path.as_deref()
    }

    /// Returns `true` when running in the development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENVIRONMENT
    }

    /// Log format matching the environment: compact for development, JSON
    /// everywhere else.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        if self.is_development() {
            LogFormat::Compact
        } else {
            LogFormat::Json
        }
    }

    /// Every field as a `(name, value)` pair in declaration order.
    ///
    /// Unset optional fields yield `None`; callers decide how to present them.
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, Option<String>)> {
        let path = |value: &Option<Utf8PathBuf>| value.as_ref().map(ToString::to_string);
        vec![
            ("environment", Some(self.environment.clone())),
            ("host", Some(self.host.clone())),
            ("port", Some(self.port.to_string())),
            ("backend", Some(self.backend.clone())),
            ("logging", Some(self.logging.to_string())),
            ("pid", path(&self.pid_path)),
            ("log", path(&self.log_path)),
            ("stdout", path(&self.stdout_path)),
            ("stderr", path(&self.stderr_path)),
            ("user", self.user.clone()),
            ("group", self.group.clone()),
        ]
    }

    fn derived_path(&self, extension: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.{extension}", self.backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn app_config() -> Config {
        Config {
            backend: "app".to_owned(),
            environment: "production".to_owned(),
            ..Config::default()
        }
    }

    #[rstest]
    fn derives_paths_from_backend(mut app_config: Config) {
        app_config.apply_defaults(Privilege::Unprivileged);
        assert_eq!(app_config.pid_path, Some(Utf8PathBuf::from("app.pid")));
        assert_eq!(app_config.log_path, Some(Utf8PathBuf::from("app.log")));
    }

    #[rstest]
    fn backend_change_before_defaulting_changes_paths(mut app_config: Config) {
        assert_eq!(app_config.pid_path(), Utf8PathBuf::from("app.pid"));
        app_config.backend = "api".to_owned();
        app_config.apply_defaults(Privilege::Unprivileged);
        assert_eq!(app_config.pid_path(), Utf8PathBuf::from("api.pid"));
        assert_eq!(app_config.log_path(), Utf8PathBuf::from("api.log"));
    }

    #[rstest]
    fn explicit_paths_survive_defaulting(mut app_config: Config) {
        app_config.pid_path = Some(Utf8PathBuf::from("/run/app/server.pid"));
        app_config.apply_defaults(Privilege::Unprivileged);
        assert_eq!(app_config.pid_path(), Utf8PathBuf::from("/run/app/server.pid"));
    }

    #[rstest]
    #[case::superuser(Privilege::Superuser, Some("worker"))]
    #[case::unprivileged(Privilege::Unprivileged, None)]
    fn identity_defaults_follow_privilege(
        mut app_config: Config,
        #[case] privilege: Privilege,
        #[case] expected: Option<&str>,
    ) {
        app_config.apply_defaults(privilege);
        assert_eq!(app_config.user.as_deref(), expected);
        assert_eq!(app_config.group.as_deref(), expected);
    }

    #[rstest]
    #[case::superuser(Privilege::Superuser)]
    #[case::unprivileged(Privilege::Unprivileged)]
    fn defaults_are_idempotent(mut app_config: Config, #[case] privilege: Privilege) {
        app_config.apply_defaults(privilege);
        let once = app_config.clone();
        app_config.apply_defaults(privilege);
        assert_eq!(app_config, once);
    }

    #[rstest]
    fn development_aliases_stderr_to_stdout() {
        let mut config = Config {
            backend: "app".to_owned(),
            ..Config::default()
        };
        config.apply_defaults(Privilege::Unprivileged);
        assert_eq!(config.stdout_path(), Some(Utf8Path::new("app.stdout")));
        assert_eq!(config.stderr_path(), config.stdout_path());
    }

    #[rstest]
    fn production_leaves_streams_unset(mut app_config: Config) {
        app_config.apply_defaults(Privilege::Unprivileged);
        assert!(app_config.stdout_path().is_none());
        assert!(app_config.stderr_path().is_none());
    }

    #[rstest]
    #[case::development("development", LogFormat::Compact)]
    #[case::production("production", LogFormat::Json)]
    #[case::staging("staging", LogFormat::Json)]
    fn log_format_follows_environment(#[case] environment: &str, #[case] expected: LogFormat) {
        let config = Config {
            environment: environment.to_owned(),
            ..Config::default()
        };
        assert_eq!(config.log_format(), expected);
    }

    #[rstest]
    fn attributes_cover_every_field() {
        let names: Vec<&str> = Config::default()
            .attributes()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "environment",
                "host",
                "port",
                "backend",
                "logging",
                "pid",
                "log",
                "stdout",
                "stderr",
                "user",
                "group",
            ]
        );
    }
}
