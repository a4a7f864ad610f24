//! Archived sprint reports.
//!
//! A report is an immutable snapshot of one sprint's analytics, written once
//! by `sc archive create` and read back or deleted by id.

use crate::analytics::{
    AssigneeRollup, CapacityForecast, ProjectRollup, SprintMetrics, SprintSummary, VelocityTrend,
};
use serde::{Deserialize, Serialize};

/// Format of `date_archived`; lexicographic order is chronological order.
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Combined dashboard payload for one sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub metrics: SprintMetrics,
    pub velocity: VelocityTrend,
    pub forecast: CapacityForecast,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sprint_details: Option<SprintSummary>,
}

/// A stored report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub archive_id: String,

    /// Local time the report was archived, as `%Y-%m-%d %H:%M:%S`
    pub date_archived: String,

    pub metrics: SprintMetrics,
    pub dashboard: Dashboard,
    pub assignees: Vec<AssigneeRollup>,
    pub projects: Vec<ProjectRollup>,
}

impl Report {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.archive_id.clone(),
            sprint_name: self.metrics.sprint_name.clone(),
            date_archived: self.date_archived.clone(),
        }
    }
}

/// Listing entry for an archived report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: String,
    pub sprint_name: String,
    pub date_archived: String,
}
