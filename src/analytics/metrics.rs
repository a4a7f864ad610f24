//! Per-sprint metrics: completion, category hours, blockers, and utilization.

use crate::models::{Blocker, BlockerKind, Category, Issue};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::sprints::SprintSummary;

/// Sprint name reported for a slice that carries no sprint at all.
pub const NO_SPRINT_NAME: &str = "No sprint data available";

pub const UNASSIGNED: &str = "Unassigned";

pub const NO_PROJECT: &str = "No Project";

/// Format used when rendering blocker due dates.
pub const DUE_DATE_FORMAT: &str = "%d/%b/%y %I:%M %p";

/// Overall state of a sprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SprintStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintStatus::NotStarted => "Not Started",
            SprintStatus::InProgress => "In Progress",
            SprintStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hours and completion for one assignee within a sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub assignee: String,
    pub total_points: f64,
    pub completed_points: f64,
    pub completion_rate: f64,
}

/// Metrics for one sprint slice. Every field is present even for an empty slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintMetrics {
    pub sprint_name: String,
    pub sprint_status: SprintStatus,
    pub completion_percentage: f64,
    pub total_story_points: f64,
    pub completed_story_points: f64,
    pub billable_hours: f64,
    pub product_hours: f64,
    pub internal_hours: f64,
    pub other_hours: f64,
    pub blockers: Vec<Blocker>,
    pub blockers_by_person: BTreeMap<String, Vec<Blocker>>,
    pub blockers_by_project: BTreeMap<String, Vec<Blocker>>,
    pub resource_utilization: Vec<ResourceUtilization>,
    pub assignee_distribution: BTreeMap<String, f64>,
    /// Listing entry for the sprint, attached when archiving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_details: Option<SprintSummary>,
}

impl SprintMetrics {
    /// Zeroed metrics for a sprint with no issues.
    pub fn empty(sprint_name: &str) -> Self {
        Self {
            sprint_name: sprint_name.to_string(),
            sprint_status: SprintStatus::NotStarted,
            completion_percentage: 0.0,
            total_story_points: 0.0,
            completed_story_points: 0.0,
            billable_hours: 0.0,
            product_hours: 0.0,
            internal_hours: 0.0,
            other_hours: 0.0,
            blockers: Vec::new(),
            blockers_by_person: BTreeMap::new(),
            blockers_by_project: BTreeMap::new(),
            resource_utilization: Vec::new(),
            assignee_distribution: BTreeMap::new(),
            sprint_details: None,
        }
    }

    /// Hours for one category.
    pub fn category_hours(&self, category: Category) -> f64 {
        match category {
            Category::Billable => self.billable_hours,
            Category::Product => self.product_hours,
            Category::Internal => self.internal_hours,
            Category::Other => self.other_hours,
        }
    }
}

/// Classify an issue as a blocker, if it is one.
///
/// Precedence: overdue, then high priority, then incomplete. Done issues
/// are never blockers. An issue is overdue when its due date falls before
/// the start of `today`.
pub fn classify_blocker(issue: &Issue, today: NaiveDate) -> Option<BlockerKind> {
    if issue.is_done() {
        return None;
    }
    let start_of_today = today.and_hms_opt(0, 0, 0)?;
    if issue.due.is_some_and(|due| due < start_of_today) {
        Some(BlockerKind::Overdue)
    } else if issue.is_high_priority() {
        Some(BlockerKind::HighPriority)
    } else {
        Some(BlockerKind::Incomplete)
    }
}

/// Render a due date the way blocker lists show it.
pub fn format_due(due: NaiveDateTime) -> String {
    due.format(DUE_DATE_FORMAT).to_string()
}

/// Build the blocker record for an issue.
pub fn blocker_for(issue: &Issue, kind: BlockerKind, issue_url_base: Option<&str>) -> Blocker {
    Blocker {
        issue_key: issue.key.clone(),
        summary: issue.summary.clone(),
        assignee: issue.assignee.clone(),
        status: issue.status.clone(),
        due_date: issue.due.map(format_due),
        priority: issue.priority.clone(),
        blocker_type: kind,
        issue_url: issue_url_base.map(|base| issue_url(base, &issue.key)),
    }
}

/// Browse URL for an issue key under a tracker base URL.
pub fn issue_url(base: &str, key: &str) -> String {
    format!("{}/browse/{}", base.trim_end_matches('/'), key)
}

/// Blockers among the given issues, in input order.
pub fn collect_blockers(
    issues: &[&Issue],
    today: NaiveDate,
    issue_url_base: Option<&str>,
) -> Vec<Blocker> {
    issues
        .iter()
        .filter_map(|issue| {
            classify_blocker(issue, today).map(|kind| blocker_for(issue, kind, issue_url_base))
        })
        .collect()
}

/// Derive the sprint status from issue statuses.
///
/// "Completed" needs every status to contain "Done"; "In Progress" needs
/// some. A completed result is downgraded when any status is not exactly
/// "Done" (e.g. a status literally named "Not Done").
pub fn sprint_status(issues: &[&Issue]) -> SprintStatus {
    if issues.is_empty() {
        return SprintStatus::NotStarted;
    }
    let contains_done = |i: &&Issue| i.status.contains(crate::models::DONE_STATUS);
    let status = if issues.iter().all(contains_done) {
        SprintStatus::Completed
    } else if issues.iter().any(contains_done) {
        SprintStatus::InProgress
    } else {
        SprintStatus::NotStarted
    };

    if status == SprintStatus::Completed && issues.iter().any(|i| !i.is_done()) {
        SprintStatus::InProgress
    } else {
        status
    }
}

/// Project key used when grouping blockers by project.
///
/// Matches the project rollup: a `{Category} |` label with an empty project
/// segment counts as no project.
fn project_key(issue: &Issue) -> String {
    let label = issue.label();
    let key = if label.matched {
        label.project
    } else {
        issue.parent_summary.clone()
    };
    key.unwrap_or_else(|| NO_PROJECT.to_string())
}

/// Compute metrics for one sprint's issues.
pub fn calculate(
    sprint_name: &str,
    issues: &[&Issue],
    today: NaiveDate,
    issue_url_base: Option<&str>,
) -> SprintMetrics {
    if issues.is_empty() {
        return SprintMetrics::empty(sprint_name);
    }

    let total = super::total_hours(issues);
    let completed = super::completed_hours(issues);
    let category_total = |category: Category| {
        issues
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.estimate_hours)
            .sum::<f64>()
    };

    let mut blockers = Vec::new();
    let mut blockers_by_person: BTreeMap<String, Vec<Blocker>> = BTreeMap::new();
    let mut blockers_by_project: BTreeMap<String, Vec<Blocker>> = BTreeMap::new();
    for issue in issues {
        let Some(kind) = classify_blocker(issue, today) else {
            continue;
        };
        let blocker = blocker_for(issue, kind, issue_url_base);
        let person = issue
            .assignee
            .clone()
            .unwrap_or_else(|| UNASSIGNED.to_string());
        blockers_by_person
            .entry(person)
            .or_default()
            .push(blocker.clone());
        blockers_by_project
            .entry(project_key(issue))
            .or_default()
            .push(blocker.clone());
        blockers.push(blocker);
    }

    let mut resource_utilization = Vec::new();
    let mut assignee_distribution = BTreeMap::new();
    for (assignee, tasks) in super::group_ordered(issues, |i| i.assignee.clone()) {
        let assignee_total = super::total_hours(&tasks);
        let assignee_completed = super::completed_hours(&tasks);
        resource_utilization.push(ResourceUtilization {
            assignee: assignee.clone(),
            total_points: assignee_total,
            completed_points: assignee_completed,
            completion_rate: super::percentage(assignee_completed, assignee_total),
        });
        assignee_distribution.insert(assignee, assignee_total);
    }

    SprintMetrics {
        sprint_name: sprint_name.to_string(),
        sprint_status: sprint_status(issues),
        completion_percentage: super::percentage(completed, total),
        total_story_points: total,
        completed_story_points: completed,
        billable_hours: category_total(Category::Billable),
        product_hours: category_total(Category::Product),
        internal_hours: category_total(Category::Internal),
        other_hours: category_total(Category::Other),
        blockers,
        blockers_by_person,
        blockers_by_project,
        resource_utilization,
        assignee_distribution,
        sprint_details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Row, analyzer};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_empty_slice_is_zeroed() {
        let metrics = calculate("Sprint 1", &[], today(), None);
        assert_eq!(metrics.sprint_name, "Sprint 1");
        assert_eq!(metrics.completion_percentage, 0.0);
        assert_eq!(metrics.total_story_points, 0.0);
        assert_eq!(metrics.sprint_status, SprintStatus::NotStarted);
        assert!(metrics.blockers.is_empty());
        assert!(metrics.blockers_by_person.is_empty());
        assert!(metrics.blockers_by_project.is_empty());
        assert!(metrics.resource_utilization.is_empty());
    }

    #[test]
    fn test_half_done_sprint() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1"),
            Row::new("A-2", "Done", "Sprint 1"),
            Row::new("A-3", "To Do", "Sprint 1"),
            Row::new("A-4", "To Do", "Sprint 1"),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(-1));
        assert_eq!(metrics.sprint_name, "Sprint 1");
        assert_eq!(metrics.total_story_points, 4.0);
        assert_eq!(metrics.completed_story_points, 2.0);
        assert_eq!(metrics.completion_percentage, 50.0);
        assert_eq!(metrics.sprint_status, SprintStatus::InProgress);
        assert_eq!(metrics.billable_hours, 4.0);
        assert_eq!(metrics.blockers.len(), 2);
    }

    #[test]
    fn test_zero_estimates_never_divide_by_zero() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1").hours(0.0),
            Row::new("A-2", "To Do", "Sprint 1").hours(0.0),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        assert_eq!(metrics.completion_percentage, 0.0);
        assert_eq!(metrics.resource_utilization[0].completion_rate, 0.0);
    }

    #[test]
    fn test_blocker_precedence() {
        let a = analyzer(&[
            Row::new("A-1", "In Progress", "Sprint 1")
                .due("2024-06-01")
                .priority("Highest"),
            Row::new("A-2", "In Progress", "Sprint 1")
                .due("2024-07-01")
                .priority("High"),
            Row::new("A-3", "To Do", "Sprint 1").due("2024-06-15"),
            Row::new("A-4", "Done", "Sprint 1").due("2024-01-01"),
        ])
        .with_today(today());
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        let kinds: Vec<(&str, BlockerKind)> = metrics
            .blockers
            .iter()
            .map(|b| (b.issue_key.as_str(), b.blocker_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("A-1", BlockerKind::Overdue),
                ("A-2", BlockerKind::HighPriority),
                ("A-3", BlockerKind::Incomplete),
            ]
        );
        assert_eq!(
            metrics.blockers[0].due_date.as_deref(),
            Some("01/Jun/24 12:00 AM")
        );
    }

    #[test]
    fn test_blockers_grouped_by_person_and_project() {
        let a = analyzer(&[
            Row::new("A-1", "To Do", "Sprint 1").assignee(""),
            Row::new("A-2", "To Do", "Sprint 1")
                .assignee("bob")
                .parent(""),
            Row::new("A-3", "To Do", "Sprint 1")
                .assignee("bob")
                .parent("[Internal] Tooling"),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        assert_eq!(metrics.blockers_by_person[UNASSIGNED].len(), 1);
        assert_eq!(metrics.blockers_by_person["bob"].len(), 2);
        assert_eq!(metrics.blockers_by_project["Apollo"].len(), 1);
        assert_eq!(metrics.blockers_by_project[NO_PROJECT].len(), 1);
        assert_eq!(metrics.blockers_by_project["[Internal] Tooling"].len(), 1);
    }

    #[test]
    fn test_empty_project_segment_groups_under_no_project() {
        let a = analyzer(&[
            Row::new("A-1", "To Do", "Sprint 1").parent("Billable |"),
            Row::new("A-2", "To Do", "Sprint 1").parent(""),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        assert_eq!(metrics.blockers_by_project.len(), 1);
        assert_eq!(metrics.blockers_by_project[NO_PROJECT].len(), 2);

        let projects = a.project_data(0);
        assert_eq!(projects[0].name, NO_PROJECT);
    }

    #[test]
    fn test_status_not_done_is_not_completed() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1"),
            Row::new("A-2", "Not Done", "Sprint 1"),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        assert_eq!(metrics.sprint_status, SprintStatus::InProgress);
    }

    #[test]
    fn test_sprint_status_tiers() {
        let done = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1"),
            Row::new("A-2", "Done", "Sprint 1"),
        ]);
        assert_eq!(
            done.sprint_metrics(&done.sprint_data(0)).sprint_status,
            SprintStatus::Completed
        );

        let fresh = analyzer(&[Row::new("A-1", "To Do", "Sprint 1")]);
        assert_eq!(
            fresh.sprint_metrics(&fresh.sprint_data(0)).sprint_status,
            SprintStatus::NotStarted
        );
    }

    #[test]
    fn test_resource_utilization_per_assignee() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1").assignee("carol").hours(3.0),
            Row::new("A-2", "To Do", "Sprint 1").assignee("carol"),
            Row::new("A-3", "To Do", "Sprint 1").assignee("dave").hours(2.0),
            Row::new("A-4", "To Do", "Sprint 1").assignee(""),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        let names: Vec<&str> = metrics
            .resource_utilization
            .iter()
            .map(|r| r.assignee.as_str())
            .collect();
        assert_eq!(names, vec!["carol", "dave"]);
        assert_eq!(metrics.resource_utilization[0].completion_rate, 75.0);
        assert_eq!(metrics.assignee_distribution["dave"], 2.0);
    }

    #[test]
    fn test_completion_percentage_bounds() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1").hours(5.0),
            Row::new("A-2", "Blocked", "Sprint 1").hours(1.5),
        ]);
        let metrics = a.sprint_metrics(&a.sprint_data(0));
        assert!(metrics.total_story_points > 0.0);
        assert!((0.0..=100.0).contains(&metrics.completion_percentage));
    }

    #[test]
    fn test_issue_url() {
        assert_eq!(
            issue_url("https://example.atlassian.net/", "A-1"),
            "https://example.atlassian.net/browse/A-1"
        );
    }
}
