//! Data models for Sprintcast entities.
//!
//! This module defines the core data structures:
//! - `Issue` - One normalized row of the tracker export
//! - `IssueTable` - The immutable normalized table held for a session
//! - `Category` - Effort category derived from the parent-summary convention
//! - `Blocker` - A non-done issue flagged within a sprint, assignee, or project slice

pub mod label;
pub mod report;

pub use label::{ParentLabel, categorize};
pub use report::{Dashboard, Report, ReportSummary};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status value that marks an issue as completed.
pub const DONE_STATUS: &str = "Done";

/// Priorities that turn an unfinished issue into a high-priority blocker.
pub const HIGH_PRIORITIES: [&str; 2] = ["Highest", "High"];

/// Delimiter used in the consolidated sprint membership string.
pub const SPRINT_DELIMITER: char = ';';

/// Effort category of an issue.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    Billable,
    Product,
    Internal,
    #[default]
    Other,
}

impl Category {
    /// All categories in precedence order.
    pub const ALL: [Category; 4] = [
        Category::Billable,
        Category::Product,
        Category::Internal,
        Category::Other,
    ];

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billable => "Billable",
            Category::Product => "Product",
            Category::Internal => "Internal",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single normalized issue.
///
/// Estimates are always in hours; the seconds-to-hours conversion happens once
/// in the normalizer and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue type (from `Issue Type` or its `Work type` alias)
    pub issue_type: String,

    /// Tracker key (e.g., "PROJ-42")
    pub key: String,

    /// Tracker numeric id
    pub id: String,

    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    /// Workflow status, kept verbatim (empty when missing)
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDateTime>,

    /// Original estimate in hours
    pub estimate_hours: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Consolidated sprint membership, `;`-joined in column order (empty if none)
    pub sprints: String,

    /// Derived effort category
    pub category: Category,
}

impl Issue {
    /// Returns true if the status is exactly "Done".
    pub fn is_done(&self) -> bool {
        self.status == DONE_STATUS
    }

    /// Returns true if the priority counts as high for blocker classification.
    pub fn is_high_priority(&self) -> bool {
        self.priority
            .as_deref()
            .is_some_and(|p| HIGH_PRIORITIES.contains(&p))
    }

    /// Iterate over the sprint names this issue belongs to.
    pub fn sprint_names(&self) -> impl Iterator<Item = &str> {
        self.sprints
            .split(SPRINT_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Exact membership test against the consolidated sprint field.
    ///
    /// Matches whole `;`-delimited tokens, so "Sprint 1" does not match an
    /// issue that only belongs to "Sprint 10".
    pub fn in_sprint(&self, sprint: &str) -> bool {
        self.sprint_names().any(|name| name == sprint)
    }

    /// Parsed parent-summary label.
    pub fn label(&self) -> ParentLabel {
        ParentLabel::parse(self.parent_summary.as_deref())
    }
}

/// The immutable normalized issue table for one session.
#[derive(Debug, Clone, Default)]
pub struct IssueTable {
    issues: Vec<Issue>,
}

impl IssueTable {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns true if any issue carries sprint membership.
    pub fn has_sprint_membership(&self) -> bool {
        self.issues.iter().any(|i| !i.sprints.is_empty())
    }

    /// Distinct issue types in first-appearance order.
    pub fn issue_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for issue in &self.issues {
            if !types.contains(&issue.issue_type) {
                types.push(issue.issue_type.clone());
            }
        }
        types
    }
}

/// Classification of a blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    /// Due date is before today
    Overdue,
    /// Priority is Highest or High
    HighPriority,
    /// Not done, no stronger signal
    Incomplete,
}

impl BlockerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockerKind::Overdue => "overdue",
            BlockerKind::HighPriority => "high_priority",
            BlockerKind::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for BlockerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-done issue flagged in a sprint, assignee, or project view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub issue_key: String,

    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    pub status: String,

    /// Due date rendered as `%d/%b/%y %I:%M %p`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    pub blocker_type: BlockerKind,

    /// Link to the issue, when an issue URL base is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
}
