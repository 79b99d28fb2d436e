// Regression tests for the dbsuite binary.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

mod common;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

/// A command with both stores written to a fresh directory used as
/// `DBSUITE_HOME`.
fn dbsuite() -> (Command, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    common::write_store(dir.path(), "preferences.sexp", common::PREFERENCES);
    common::write_store(dir.path(), "data-sources.sexp", common::DATA_SOURCES);

    let mut cmd = Command::cargo_bin("dbsuite").unwrap();
    cmd.env("DBSUITE_HOME", dir.path())
        .env_remove("RUST_LOG")
        .arg("--no-color");
    (cmd, dir)
}

#[test]
fn no_labels_runs_generic_suite() {
    let (mut cmd, _dir) = dbsuite();
    cmd.assert()
        .success()
        .stdout(contains("PASS: generic/literals/portable"))
        .stdout(contains("failed 0"));
}

#[test]
fn loopback_profile_passes() {
    let (mut cmd, _dir) = dbsuite();
    cmd.arg("lab")
        .assert()
        .success()
        .stdout(contains("PASS: lab/lb-oracle/type-mapping/boolean[oracle]"))
        .stdout(contains("generic/").not());
}

#[test]
fn unknown_label_reports_diagnostic_and_continues() {
    let (mut cmd, _dir) = dbsuite();
    cmd.args(["ghost", "lb"])
        .assert()
        .failure()
        .stdout(contains("PASS: lb/lb/connection/connect"))
        .stderr(contains("dbsuite::resolve::unknown_name").and(contains("ghost")));
}

#[test]
fn no_color_covers_skipped_label_diagnostics() {
    let (mut cmd, _dir) = dbsuite();
    cmd.env("TERM", "xterm-256color")
        .env_remove("NO_COLOR")
        .args(["ghost", "lb"])
        .assert()
        .failure()
        .stderr(contains("skipped label 'ghost':"))
        .stderr(contains("\u{1b}[").not());
}

#[test]
fn store_syntax_error_is_fatal() {
    let (mut cmd, dir) = dbsuite();
    let bad = common::write_store(dir.path(), "bad.sexp", "(preferences (profiles (a (dsn x))");
    cmd.arg("-f")
        .arg(&bad)
        .arg("lb")
        .assert()
        .failure()
        .stderr(contains("dbsuite::parse"));
}

#[test]
fn explicit_missing_store_is_fatal() {
    let (mut cmd, dir) = dbsuite();
    cmd.arg("--dsn-file")
        .arg(dir.path().join("absent.sexp"))
        .assert()
        .failure()
        .stderr(contains("absent.sexp"));
}

#[test]
fn list_prints_resolved_configs() {
    let (mut cmd, _dir) = dbsuite();
    cmd.args(["--list", "pair"])
        .assert()
        .success()
        .stdout(contains("pair\n  x  loopback  (sqlite)\n  z  loopback  (postgresql mysql)\n"));
}

#[test]
fn json_report_is_machine_readable() {
    let (mut cmd, _dir) = dbsuite();
    let output = cmd.args(["--format", "json", "lb"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["suites"][0]["label"], "lb");
}

#[cfg(unix)]
mod renderer_mode {
    use std::io::{BufRead, BufReader, Read};
    use std::path::Path;
    use std::process::{Child, Command, ExitStatus, Stdio};
    use std::thread;

    use dbsuite::cli::INTERRUPT_ADVISORY;

    use super::common;

    fn spawn_gui(home: &Path, labels: &[&str]) -> Child {
        Command::new(env!("CARGO_BIN_EXE_dbsuite"))
            .env("DBSUITE_HOME", home)
            .env_remove("RUST_LOG")
            .args(["--no-color", "--log-level", "dbsuite=debug", "--gui"])
            .args(labels)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    /// Reads stderr until a line contains `marker`, sends SIGINT, then
    /// collects everything that is left.
    fn interrupt_after(mut child: Child, marker: &str) -> (ExitStatus, String, String) {
        let mut stdout = child.stdout.take().unwrap();
        let drain = thread::spawn(move || {
            let mut text = String::new();
            stdout.read_to_string(&mut text).unwrap();
            text
        });

        let mut stderr = BufReader::new(child.stderr.take().unwrap());
        let mut seen = String::new();
        let mut line = String::new();
        while stderr.read_line(&mut line).unwrap() > 0 {
            seen.push_str(&line);
            let found = line.contains(marker);
            line.clear();
            if found {
                break;
            }
        }
        assert!(seen.contains(marker), "never saw {:?}:\n{}", marker, seen);

        let status = Command::new("kill")
            .args(["-INT", &child.id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        stderr.read_to_string(&mut seen).unwrap();
        let status = child.wait().unwrap();
        (status, drain.join().unwrap(), seen)
    }

    fn advisory_lines(stderr: &str) -> usize {
        stderr.lines().filter(|l| *l == INTERRUPT_ADVISORY).count()
    }

    #[test]
    fn interrupt_after_rendering_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        common::write_store(dir.path(), "preferences.sexp", common::PREFERENCES);
        common::write_store(dir.path(), "data-sources.sexp", common::DATA_SOURCES);

        let child = spawn_gui(dir.path(), &["ghost", "lb"]);
        let (status, stdout, stderr) = interrupt_after(child, "outline rendered");

        assert_eq!(status.code(), Some(0), "{}", stderr);
        assert_eq!(advisory_lines(&stderr), 1, "{}", stderr);
        assert!(stdout.contains("[pass] connect"), "{}", stdout);

        let skipped = stderr.find("skipped label").unwrap();
        assert!(stderr[skipped..].contains("'ghost'"));
        assert!(skipped < stderr.find(INTERRUPT_ADVISORY).unwrap());
    }

    #[test]
    fn interrupt_while_rendering_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let many = "(dsn lb) ".repeat(400);
        let prefs = format!("(preferences (profiles (big (profile {}))))", many);
        common::write_store(dir.path(), "preferences.sexp", &prefs);
        common::write_store(dir.path(), "data-sources.sexp", common::DATA_SOURCES);

        let child = spawn_gui(dir.path(), &["big"]);
        let (status, _stdout, stderr) = interrupt_after(child, "interrupt handler installed");

        assert_eq!(status.code(), Some(0), "{}", stderr);
        assert_eq!(advisory_lines(&stderr), 1, "{}", stderr);
    }
}
