//! Sprintcast - sprint metrics and capacity forecasting from agile-tracker exports.
//!
//! This library provides the core functionality for the `sc` CLI tool:
//! normalizing exported issue tables, deriving sprints, computing sprint
//! metrics and rollups, projecting future capacity, and archiving reports.

pub mod analytics;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;


/// Library-level error type for Sprintcast operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No data loaded: run `sc load <file.csv>` first")]
    NoSession,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Sprintcast operations.
pub type Result<T> = std::result::Result<T, Error>;
