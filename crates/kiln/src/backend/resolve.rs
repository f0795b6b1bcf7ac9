//! Locates the entry file for the configured backend.

use std::fmt;
use std::path::{Path, PathBuf};

use kiln_config::DEFAULT_BACKEND;
use thiserror::Error;
use tracing::debug;

use super::BACKEND_TARGET;

/// Extension of backend manifest files.
pub const MANIFEST_EXTENSION: &str = "toml";
/// Directory searched after the working directory itself.
pub const CONFIG_DIRECTORY: &str = "config";

/// A located backend entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEntry {
    /// A manifest file on disk.
    Manifest(PathBuf),
    /// The backend compiled into `kiln`.
    BuiltIn,
}

impl fmt::Display for BackendEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(path) => write!(formatter, "{}", path.display()),
            Self::BuiltIn => formatter.write_str("<built-in>"),
        }
    }
}

/// Failure to locate any backend entry point.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// None of the candidates was a readable file.
    #[error("can't find backend in {} places", format_attempted(.attempted))]
    NotFound {
        /// Every location tried, in order.
        attempted: Vec<PathBuf>,
    },
}

fn format_attempted(attempted: &[PathBuf]) -> String {
    let quoted: Vec<String> = attempted
        .iter()
        .map(|path| format!("\"{}\"", path.display()))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Candidate manifest locations for `name`, in precedence order.
#[must_use]
pub fn candidates(cwd: &Path, name: &str) -> Vec<PathBuf> {
    let file = format!("{name}.{MANIFEST_EXTENSION}");
    vec![cwd.join(&file), cwd.join(CONFIG_DIRECTORY).join(&file)]
}

/// Picks the first usable entry point for `name`.
///
/// Manifests in the working directory win over those under `config/`. The
/// built-in backend is only considered for the default identifier.
pub fn resolve_backend(cwd: &Path, name: &str) -> Result<BackendEntry, ResolveError> {
    let attempted = candidates(cwd, name);
    if let Some(found) = attempted.iter().find(|path| is_readable_file(path)) {
        debug!(target: BACKEND_TARGET, path = %found.display(), "backend manifest found");
        return Ok(BackendEntry::Manifest(found.clone()));
    }
    if name == DEFAULT_BACKEND {
        debug!(target: BACKEND_TARGET, "falling back to built-in backend");
        return Ok(BackendEntry::BuiltIn);
    }
    Err(ResolveError::NotFound { attempted })
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn workdir() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir(dir.path().join("config")).expect("config dir");
        dir
    }

    fn touch(path: &Path) {
        fs::write(path, "command = \"true\"\n").expect("write manifest");
    }

    #[rstest]
    fn working_directory_beats_config_directory(workdir: TempDir) {
        let primary = workdir.path().join("app.toml");
        touch(&primary);
        touch(&workdir.path().join("config/app.toml"));

        let entry = resolve_backend(workdir.path(), "app").expect("backend should resolve");
        assert_eq!(entry, BackendEntry::Manifest(primary));
    }

    #[rstest]
    fn config_directory_is_second_choice(workdir: TempDir) {
        let secondary = workdir.path().join("config/app.toml");
        touch(&secondary);

        let entry = resolve_backend(workdir.path(), "app").expect("backend should resolve");
        assert_eq!(entry, BackendEntry::Manifest(secondary));
    }

    #[rstest]
    fn directories_are_not_entry_points(workdir: TempDir) {
        fs::create_dir(workdir.path().join("app.toml")).expect("decoy dir");
        assert!(resolve_backend(workdir.path(), "app").is_err());
    }

    #[rstest]
    fn default_identifier_falls_back_to_built_in(workdir: TempDir) {
        let entry = resolve_backend(workdir.path(), "backend").expect("built-in backend");
        assert_eq!(entry, BackendEntry::BuiltIn);
    }

    #[rstest]
    fn missing_backend_lists_both_locations(workdir: TempDir) {
        let error = resolve_backend(workdir.path(), "app").expect_err("no backend exists");
        let ResolveError::NotFound { attempted } = &error;
        assert_eq!(attempted, &candidates(workdir.path(), "app"));

        let message = error.to_string();
        assert!(message.starts_with("can't find backend in ["));
        assert!(message.contains(&format!("{}", workdir.path().join("app.toml").display())));
        assert!(message.contains(&format!(
            "{}",
            workdir.path().join("config/app.toml").display()
        )));
    }
}
