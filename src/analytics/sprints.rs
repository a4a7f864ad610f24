//! Sprint identification and ordering.
//!
//! Sprints are derived from the consolidated membership field. Names that
//! follow `"<year> Sprint <n>"` or `"Sprint <n>"` sort numerically; anything
//! else sorts alphabetically after them. When no issue carries membership,
//! one sprint is synthesized per distinct due date.

use crate::models::{Category, Issue, IssueTable};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static YEAR_SPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})\s+Sprint\s+(\d+)").expect("valid regex"));

static NUMBERED_SPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Sprint\s+(\d+)").expect("valid regex"));

/// A derived sprint bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub name: String,

    /// Set for sprints synthesized from due dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending: Option<NaiveDate>,
}

impl Sprint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ending: None,
        }
    }

    pub fn ending_on(date: NaiveDate) -> Self {
        Self {
            name: format!("Sprint ending {}", date.format("%d %b %Y")),
            ending: Some(date),
        }
    }

    /// Returns true if the issue belongs to this sprint.
    pub fn contains(&self, issue: &Issue) -> bool {
        match self.ending {
            Some(date) => issue.due.is_some_and(|due| due.date() == date),
            None => issue.in_sprint(&self.name),
        }
    }
}

/// A run of digits from a sprint name, ordered by numeric value.
///
/// Kept as text so numbers of any length order correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintNumber(String);

impl SprintNumber {
    pub fn new(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Self(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    }
}

impl From<u64> for SprintNumber {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Ord for SprintNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SprintNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Three-tier ordering key for sprint names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SprintSortKey {
    /// `"<year> Sprint <n>"`
    YearNumbered(SprintNumber, SprintNumber),
    /// `"Sprint <n>"`
    Numbered(SprintNumber),
    /// Anything else, alphabetical
    Named(String),
}

impl SprintSortKey {
    pub fn for_name(name: &str) -> Self {
        if let Some(caps) = YEAR_SPRINT.captures(name) {
            return SprintSortKey::YearNumbered(
                SprintNumber::new(&caps[1]),
                SprintNumber::new(&caps[2]),
            );
        }
        if let Some(caps) = NUMBERED_SPRINT.captures(name) {
            return SprintSortKey::Numbered(SprintNumber::new(&caps[1]));
        }
        SprintSortKey::Named(name.to_string())
    }
}

/// Compare two sprint names under the three-tier key, ties broken by name.
pub fn compare_sprint_names(a: &str, b: &str) -> Ordering {
    SprintSortKey::for_name(a)
        .cmp(&SprintSortKey::for_name(b))
        .then_with(|| a.cmp(b))
}

/// Sort sprint names in place.
pub fn sort_sprint_names(names: &mut [String]) {
    names.sort_by(|a, b| compare_sprint_names(a, b));
}

/// Derive the ordered sprint list for a table. The last element is current.
pub fn identify_sprints(table: &IssueTable) -> Vec<Sprint> {
    if table.has_sprint_membership() {
        let distinct: BTreeSet<&str> = table
            .issues()
            .iter()
            .flat_map(|issue| issue.sprint_names())
            .collect();
        let mut names: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        sort_sprint_names(&mut names);
        return names.into_iter().map(Sprint::named).collect();
    }

    let dates: BTreeSet<NaiveDate> = table
        .issues()
        .iter()
        .filter_map(|issue| issue.due.map(|d| d.date()))
        .collect();
    dates.into_iter().map(Sprint::ending_on).collect()
}

/// Resolve a possibly negative index against a list length.
///
/// Negative indexes count from the end (-1 is last). Anything out of range
/// clamps to the last position. Returns `None` only for an empty list.
pub fn resolve_index(len: usize, index: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize).filter(|&i| i < len)
    };
    Some(resolved.unwrap_or(len - 1))
}

/// Hours for one category within a sprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryHours {
    pub total: f64,
    pub completed: f64,
    /// Completed as a percentage of total (0 when total is 0)
    pub utilization: f64,
}

/// Overview of one sprint for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintSummary {
    pub name: String,
    pub total_points: f64,
    pub completed_points: f64,
    /// Completed as a percentage of total (0 when total is 0)
    pub utilization: f64,
    pub categories: BTreeMap<Category, CategoryHours>,
    /// Most common due date among the sprint's issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
}

/// Summarize one sprint's issues.
pub fn summarize(name: &str, issues: &[&Issue]) -> SprintSummary {
    let total_points = super::total_hours(issues);
    let completed_points = super::completed_hours(issues);

    let categories = Category::ALL
        .into_iter()
        .map(|category| {
            let in_category: Vec<&Issue> = issues
                .iter()
                .copied()
                .filter(|i| i.category == category)
                .collect();
            let total = super::total_hours(&in_category);
            let completed = super::completed_hours(&in_category);
            let hours = CategoryHours {
                total,
                completed,
                utilization: super::percentage(completed, total),
            };
            (category, hours)
        })
        .collect();

    SprintSummary {
        name: name.to_string(),
        total_points,
        completed_points,
        utilization: super::percentage(completed_points, total_points),
        categories,
        end_date: most_common_due(issues),
    }
}

/// Mode of the due dates; ties resolve to the earliest.
fn most_common_due(issues: &[&Issue]) -> Option<NaiveDateTime> {
    let mut counts: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for due in issues.iter().filter_map(|i| i.due) {
        *counts.entry(due).or_default() += 1;
    }
    let max = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, count)| *count == max)
        .map(|(due, _)| due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Row, analyzer};

    #[test]
    fn test_numeric_sort_with_year() {
        let mut names = vec!["2025 Sprint 25".to_string(), "2025 Sprint 9".to_string()];
        sort_sprint_names(&mut names);
        assert_eq!(names, vec!["2025 Sprint 9", "2025 Sprint 25"]);
    }

    #[test]
    fn test_sort_tiers() {
        let mut names: Vec<String> = [
            "Backlog grooming",
            "Sprint 10",
            "2024 Sprint 3",
            "Sprint 9",
            "2025 Sprint 1",
            "Alpha",
            "2024 Sprint 12",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        sort_sprint_names(&mut names);
        assert_eq!(
            names,
            vec![
                "2024 Sprint 3",
                "2024 Sprint 12",
                "2025 Sprint 1",
                "Sprint 9",
                "Sprint 10",
                "Alpha",
                "Backlog grooming",
            ]
        );
    }

    #[test]
    fn test_sort_key_requires_prefix_match() {
        assert_eq!(
            SprintSortKey::for_name("Team Sprint 4"),
            SprintSortKey::Named("Team Sprint 4".to_string())
        );
        assert_eq!(
            SprintSortKey::for_name("Sprint 4 (extended)"),
            SprintSortKey::Numbered(4.into())
        );
    }

    #[test]
    fn test_oversized_sprint_numbers_stay_numeric() {
        let mut names: Vec<String> = [
            "Alpha",
            "Sprint 99999999999999999999",
            "Sprint 7",
            "Sprint 007",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        sort_sprint_names(&mut names);
        assert_eq!(
            names,
            vec!["Sprint 007", "Sprint 7", "Sprint 99999999999999999999", "Alpha"]
        );
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(0, -1), None);
        assert_eq!(resolve_index(3, 0), Some(0));
        assert_eq!(resolve_index(3, 2), Some(2));
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, -3), Some(0));
        assert_eq!(resolve_index(3, -4), Some(2));
        assert_eq!(resolve_index(3, 7), Some(2));
    }

    #[test]
    fn test_identify_from_membership() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 2;Sprint 10"),
            Row::new("A-2", "Done", "Sprint 1"),
        ]);
        let names: Vec<&str> = a.sprints().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sprint 1", "Sprint 2", "Sprint 10"]);
        assert_eq!(a.current_sprint().map(|s| s.name.as_str()), Some("Sprint 10"));
    }

    #[test]
    fn test_identify_falls_back_to_due_dates() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "").due("2024-02-14"),
            Row::new("A-2", "Done", "").due("2024-01-31"),
            Row::new("A-3", "To Do", "").due("2024-02-14"),
            Row::new("A-4", "To Do", ""),
        ]);
        let names: Vec<&str> = a.sprints().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Sprint ending 31 Jan 2024", "Sprint ending 14 Feb 2024"]
        );
        assert_eq!(a.sprint_data(-1).issues.len(), 2);
    }

    #[test]
    fn test_summarize_categories_and_end_date() {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1").due("2024-01-10").hours(2.0),
            Row::new("A-2", "To Do", "Sprint 1")
                .due("2024-01-10")
                .parent("Product | Beta"),
            Row::new("A-3", "To Do", "Sprint 1").due("2024-01-05"),
        ]);
        let summaries = a.all_sprints();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.total_points, 4.0);
        assert_eq!(s.completed_points, 2.0);
        assert_eq!(s.utilization, 50.0);
        assert_eq!(s.categories[&Category::Billable].total, 3.0);
        assert_eq!(s.categories[&Category::Billable].completed, 2.0);
        assert_eq!(s.categories[&Category::Product].utilization, 0.0);
        assert_eq!(s.categories[&Category::Other].total, 0.0);
        assert_eq!(
            s.end_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
    }
}
