//! CLI argument definitions for Sprintcast.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("SC_GIT_COMMIT"),
    "\nbuilt: ",
    env!("SC_BUILD_TIMESTAMP"),
);

/// Sprintcast - sprint metrics and capacity forecasts from tracker exports.
///
/// Start with `sc load export.csv`, then `sc metrics` or `sc dashboard`.
#[derive(Parser, Debug)]
#[command(name = "sc")]
#[command(author, version, long_version = LONG_VERSION, about = "Sprint metrics and capacity forecasts from agile-tracker CSV exports", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Log debug detail to stderr
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Session to operate on (defaults to the most recently loaded export)
    #[arg(long, global = true, env = "SC_SESSION")]
    pub session: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Sprint selection shared by per-sprint commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct SprintArgs {
    /// Sprint index: 0-based, negative counts from the end (-1 is current).
    /// Out-of-range values select the last sprint.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub sprint: isize,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a CSV export into a new session and make it current
    Load {
        /// Path to the exported CSV file
        file: PathBuf,
    },

    /// List every sprint with hours and category breakdown
    Sprints,

    /// Metrics for one sprint: completion, category hours, blockers
    Metrics {
        #[command(flatten)]
        sprint: SprintArgs,
    },

    /// Completed hours per sprint
    Velocity,

    /// Capacity forecast for a sprint and the two after it
    Forecast {
        #[command(flatten)]
        sprint: SprintArgs,

        /// Moving-average window in sprints
        #[arg(long)]
        window: Option<usize>,

        /// Team capacity in hours (estimated from history when omitted)
        #[arg(long)]
        capacity: Option<f64>,
    },

    /// Per-assignee rollup of one sprint
    Assignees {
        #[command(flatten)]
        sprint: SprintArgs,
    },

    /// Per-project rollup of one sprint
    Projects {
        #[command(flatten)]
        sprint: SprintArgs,
    },

    /// Metrics, velocity and forecast in one payload
    Dashboard {
        #[command(flatten)]
        sprint: SprintArgs,

        /// Team capacity in hours (estimated from history when omitted)
        #[arg(long)]
        capacity: Option<f64>,
    },

    /// Distinct issue types in the loaded export
    IssueTypes,

    /// Report archive commands
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },

    /// Session management commands
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Report archive subcommands
#[derive(Subcommand, Debug)]
pub enum ArchiveCommands {
    /// Archive a snapshot of one sprint's analytics
    Create {
        #[command(flatten)]
        sprint: SprintArgs,
    },

    /// List archived reports, newest first
    List,

    /// Show an archived report
    Show {
        /// Archive id
        id: String,
    },

    /// Delete an archived report
    Delete {
        /// Archive id
        id: String,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List loaded sessions, newest first
    List,

    /// Show the current (or `--session`) session
    Show,

    /// Remove a session (its archived reports are kept)
    Rm {
        /// Session id
        id: String,
    },

    /// Remove sessions older than the configured TTL
    Prune,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration values and where they came from
    Show,

    /// Set a configuration value in the local config.kdl
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}
