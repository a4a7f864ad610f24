//! Smoke tests for the sc CLI.
//!
//! These tests verify basic CLI functionality:
//! - `sc --version` outputs version info
//! - `sc --help` lists the commands
//! - `sc` (no args) fails with usage

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the sc binary.
fn sc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sc"))
}

#[test]
fn test_version_flag() {
    sc().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sc"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_long_version_has_build_info() {
    sc().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit:"));
}

#[test]
fn test_help_flag() {
    sc().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("forecast"))
        .stdout(predicate::str::contains("archive"));
}

#[test]
fn test_no_args_prints_usage() {
    sc().assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    sc().args(["-v", "-q", "sprints"]).assert().failure();
}
