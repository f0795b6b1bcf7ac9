//! Integration tests for the `kiln` binary.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

fn wait_until(description: &str, mut ready: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !ready() {
        assert!(Instant::now() < deadline, "{description}");
        thread::sleep(POLL_INTERVAL);
    }
}

fn kiln(workdir: &Path) -> Command {
    let mut command = cargo_bin_cmd!("kiln");
    command
        .current_dir(workdir)
        .env_remove("KILN_ENV")
        .env_remove("APP_ENV")
        .env_remove("KILN_BINSTUB")
        .env_remove("KILN_LOG");
    command
}

#[test]
fn help_prints_usage_banner() {
    let dir = TempDir::new().expect("temp dir");
    kiln(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: kiln [options]").and(contains("--daemonize")));
}

#[test]
fn version_prints_package_version() {
    let dir = TempDir::new().expect("temp dir");
    kiln(dir.path())
        .arg("-v")
        .assert()
        .success()
        .stdout(format!("kiln {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_prints_resolved_configuration() {
    let dir = TempDir::new().expect("temp dir");
    kiln(dir.path())
        .args(["-e", "production", "-b", "app", "-i"])
        .assert()
        .success()
        .stdout(
            contains("Server configuration:\n")
                .and(contains("  environment: production\n"))
                .and(contains("  pid: app.pid\n"))
                .and(contains("  stdout: off\n")),
        );
}

#[test]
fn info_reads_engine_environment_variable() {
    let dir = TempDir::new().expect("temp dir");
    kiln(dir.path())
        .env("KILN_ENV", "staging")
        .env("APP_ENV", "production")
        .arg("-i")
        .assert()
        .success()
        .stdout(contains("  environment: staging\n"));
}

#[test]
fn missing_backend_lists_attempted_locations() {
    let dir = TempDir::new().expect("temp dir");
    let primary = dir.path().join("app.toml");
    let secondary = dir.path().join("config").join("app.toml");
    kiln(dir.path())
        .args(["-b", "app"])
        .assert()
        .failure()
        .code(1)
        .stdout(
            contains("can't find backend in")
                .and(contains(primary.display().to_string()))
                .and(contains(secondary.display().to_string())),
        );
}

#[test]
fn malformed_port_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    kiln(dir.path())
        .args(["-p", "eighty"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn daemonized_backend_records_its_pid() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("app.toml"),
        "command = \"sleep\"\nargs = [\"30\"]\n",
    )
    .expect("write manifest");

    let output = kiln(dir.path())
        .args(["-e", "production", "-b", "app", "-d"])
        .output()
        .expect("kiln should run");
    assert!(output.status.success(), "invoker should exit successfully");
    let announced: i32 = String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse()
        .expect("daemon should announce its pid");

    let pid_path = dir.path().join("app.pid");
    wait_until("pid file never appeared", || pid_path.exists());
    let recorded: i32 = fs::read_to_string(&pid_path)
        .expect("read pid file")
        .trim()
        .parse()
        .expect("pid file should hold an integer");
    assert_eq!(recorded, announced);

    let daemon = Pid::from_raw(recorded);
    assert!(kill(daemon, None).is_ok(), "daemon should be alive");
    kill(daemon, Signal::SIGTERM).expect("terminate daemon");
}

#[test]
fn daemon_appends_both_streams_to_development_stdout() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("app.toml"),
        concat!(
            "command = \"sh\"\n",
            "args = [\"-c\", \"echo out; echo err >&2; grep Umask /proc/self/status\"]\n",
        ),
    )
    .expect("write manifest");
    let stdout_path = dir.path().join("app.stdout");
    fs::write(&stdout_path, "pre\n").expect("seed stdout file");

    kiln(dir.path())
        .args(["-b", "app", "-d"])
        .assert()
        .success();

    wait_until("daemon never reported its umask", || {
        fs::read_to_string(&stdout_path).is_ok_and(|captured| captured.contains("Umask:"))
    });
    let captured = fs::read_to_string(&stdout_path).expect("read stdout file");
    assert_eq!(
        captured.lines().collect::<Vec<_>>(),
        vec!["pre", "out", "err", "Umask:\t0000"]
    );
}
