//! Environment-name resolution from process environment variables.
//!
//! The engine-specific variable wins over the generic framework variable; the
//! literal `development` is the final fallback. After resolution the chosen
//! name is written back into the framework variable so collaborating code sees
//! a single source of truth.

use std::collections::BTreeMap;
use std::env;

use crate::defaults::DEFAULT_ENVIRONMENT;

/// Engine-specific environment variable, consulted first.
pub const ENGINE_ENV_VAR: &str = "KILN_ENV";

/// Generic framework environment variable, consulted second and updated with
/// the resolved environment.
pub const FRAMEWORK_ENV_VAR: &str = "APP_ENV";

/// Read/write access to environment variables.
pub trait EnvironmentSource {
    /// Returns the value of `key`, if set and valid Unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// Sets `key` to `value`.
    fn set_var(&mut self, key: &str, value: &str);
}

/// Environment backed by the real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        // Environment mutation is `unsafe` on the 2024 edition. The supervisor
        // writes here from the parse pipeline before any other thread exists.
        unsafe { env::set_var(key, value) };
    }
}

/// In-memory environment, used where the process environment must stay
/// untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapEnvironment {
    vars: BTreeMap<String, String>,
}

impl MapEnvironment {
    /// Builds an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Returns the value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl EnvironmentSource for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_owned(), value.to_owned());
    }
}

/// Resolves the execution environment name.
///
/// Empty values count as unset so `KILN_ENV=` does not shadow `APP_ENV`.
#[must_use]
pub fn resolve_environment(source: &dyn EnvironmentSource) -> String {
    [ENGINE_ENV_VAR, FRAMEWORK_ENV_VAR]
        .into_iter()
        .filter_map(|key| source.var(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned())
}
