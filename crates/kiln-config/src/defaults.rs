//! Built-in configuration values and names shared across the workspace.

/// Environment name used when neither environment variable is set.
pub const DEFAULT_ENVIRONMENT: &str = DEVELOPMENT_ENVIRONMENT;

/// Name of the development environment.
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// Host the backend binds to unless overridden.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the backend binds to unless overridden.
pub const DEFAULT_PORT: u16 = 3434;

/// Backend identifier used unless overridden; also names the built-in backend.
pub const DEFAULT_BACKEND: &str = "backend";

/// Unprivileged account and group assigned when started as the superuser.
pub const DEFAULT_WORKER_IDENTITY: &str = "worker";
