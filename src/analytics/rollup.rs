//! Per-assignee and per-project views of a sprint.
//!
//! Blockers here use the same classifier and labels as sprint metrics, so an
//! issue reads the same way whichever view it shows up in.

use crate::models::{Blocker, Category, Issue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metrics::{NO_PROJECT, collect_blockers};

/// One assignee's share of a sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeRollup {
    pub name: String,
    pub total_tasks: usize,
    pub total_points: f64,
    pub completed_points: f64,
    pub completion_percentage: f64,
    /// Hours per category, only for categories the assignee has work in
    pub category_breakdown: BTreeMap<Category, f64>,
    pub status_counts: BTreeMap<String, usize>,
    pub blockers: Vec<Blocker>,
}

/// One project's share of a sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRollup {
    pub name: String,
    pub total_tasks: usize,
    pub total_points: f64,
    pub completed_points: f64,
    pub completion_percentage: f64,
    pub status_counts: BTreeMap<String, usize>,
    /// Distinct assignees in first-appearance order
    pub team_members: Vec<String>,
    pub blockers: Vec<Blocker>,
    pub assignee_distribution: BTreeMap<String, f64>,
}

fn status_counts(issues: &[&Issue]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.status.clone()).or_default() += 1;
    }
    counts
}

/// Group a sprint's issues by assignee. Unassigned issues are skipped.
pub fn by_assignee(
    issues: &[&Issue],
    today: NaiveDate,
    issue_url_base: Option<&str>,
) -> Vec<AssigneeRollup> {
    super::group_ordered(issues, |i| i.assignee.clone())
        .into_iter()
        .map(|(name, tasks)| {
            let total_points = super::total_hours(&tasks);
            let completed_points = super::completed_hours(&tasks);
            let mut category_breakdown: BTreeMap<Category, f64> = BTreeMap::new();
            for task in &tasks {
                *category_breakdown.entry(task.category).or_default() += task.estimate_hours;
            }
            AssigneeRollup {
                name,
                total_tasks: tasks.len(),
                total_points,
                completed_points,
                completion_percentage: super::percentage(completed_points, total_points),
                category_breakdown,
                status_counts: status_counts(&tasks),
                blockers: collect_blockers(&tasks, today, issue_url_base),
            }
        })
        .collect()
}

/// Grouping key for the project view.
#[derive(Debug, Clone, PartialEq)]
enum ProjectKey {
    Project(String),
    Category(Category),
}

impl ProjectKey {
    fn into_name(self) -> String {
        match self {
            ProjectKey::Project(name) => name,
            ProjectKey::Category(category) => category.to_string(),
        }
    }
}

/// Group a sprint's issues by project.
///
/// When any parent summary follows the `{Category} | {Project}` convention,
/// only those issues are grouped, by project segment. Otherwise issues are
/// grouped by category.
pub fn by_project(
    issues: &[&Issue],
    today: NaiveDate,
    issue_url_base: Option<&str>,
) -> Vec<ProjectRollup> {
    let has_projects = issues.iter().any(|i| i.label().matched);
    let groups = if has_projects {
        super::group_ordered(issues, |i| {
            let label = i.label();
            label.matched.then(|| {
                ProjectKey::Project(label.project.unwrap_or_else(|| NO_PROJECT.to_string()))
            })
        })
    } else {
        let mut groups = super::group_ordered(issues, |i| Some(ProjectKey::Category(i.category)));
        groups.sort_by_key(|(key, _)| match key {
            ProjectKey::Category(category) => *category,
            ProjectKey::Project(_) => Category::Other,
        });
        groups
    };

    groups
        .into_iter()
        .map(|(key, tasks)| {
            let total_points = super::total_hours(&tasks);
            let completed_points = super::completed_hours(&tasks);
            let team_members = super::group_ordered(&tasks, |i| i.assignee.clone());
            let assignee_distribution = team_members
                .iter()
                .map(|(name, owned)| (name.clone(), super::total_hours(owned)))
                .collect();
            ProjectRollup {
                name: key.into_name(),
                total_tasks: tasks.len(),
                total_points,
                completed_points,
                completion_percentage: super::percentage(completed_points, total_points),
                status_counts: status_counts(&tasks),
                team_members: team_members.into_iter().map(|(name, _)| name).collect(),
                blockers: collect_blockers(&tasks, today, issue_url_base),
                assignee_distribution,
            }
        })
        .collect()
}
