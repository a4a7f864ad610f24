//! Common test utilities for sprintcast integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/sprintcast/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Header of a tracker export with every required column.
pub const HEADER: &str = "Issue Type,Issue key,Issue id,Summary,Assignee,Assignee Id,Reporter,Reporter Id,Priority,Status,Resolution,Created,Updated,Due date,Original estimate,Parent,Parent summary,Description,Sprint";

/// Two finished sprints and a current one, across two projects and people.
pub const SAMPLE_ROWS: &[&str] = &[
    "Task,APP-1,1001,Login page,alice,,rep,,Medium,Done,Done,2024-01-01,2024-01-10,,28800,P-1,Billable | Apollo,,Sprint 1",
    "Task,APP-2,1002,Signup flow,bob,,rep,,Medium,Done,Done,2024-01-01,2024-01-10,,14400,P-1,Billable | Apollo,,Sprint 1",
    "Bug,APP-3,1003,Crash on save,alice,,rep,,Medium,Done,Done,2024-01-11,2024-01-20,,21600,P-2,Product | Zephyr,,Sprint 2",
    "Task,APP-4,1004,Billing export,bob,,rep,,Medium,Done,Done,2024-01-11,2024-01-20,,14400,P-1,Billable | Apollo,,Sprint 2",
    "Task,APP-5,1005,Audit log,alice,,rep,,Medium,Done,Done,2024-01-21,2024-01-25,,14400,P-2,Product | Zephyr,,Sprint 3",
    "Task,APP-6,1006,Report view,bob,,rep,,Highest,In Progress,Unresolved,2024-01-21,2024-01-25,,28800,P-1,Billable | Apollo,,Sprint 3",
    "Task,APP-7,1007,Cleanup,,,rep,,Low,To Do,Unresolved,2024-01-21,2024-01-25,,7200,P-3,Internal | Ops,,Sprint 3",
];

/// A test environment with isolated data and config directories.
///
/// The `sc()` method returns a `Command` that sets `SC_DATA_DIR` and
/// `SC_CONFIG_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
    pub work_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Create an environment with the sample export already loaded.
    pub fn loaded() -> Self {
        let env = Self::new();
        let csv = env.sample_csv();
        env.sc().arg("load").arg(&csv).assert().success();
        env
    }

    /// Get a Command for the sc binary with isolated directories.
    pub fn sc(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sc"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("SC_DATA_DIR", self.data_dir.path());
        cmd.env("SC_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("SC_SESSION");
        cmd.env_remove("SC_LOG");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Write a CSV file into the work directory.
    pub fn write_csv(&self, name: &str, header: &str, rows: &[&str]) -> PathBuf {
        let mut text = String::from(header);
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        let path = self.work_dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// Write the sample export and return its path.
    pub fn sample_csv(&self) -> PathBuf {
        self.write_csv("export.csv", HEADER, SAMPLE_ROWS)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout should be JSON")
}
