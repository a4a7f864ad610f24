//! Analytics core.
//!
//! A [`SprintAnalyzer`] owns the immutable normalized [`IssueTable`] for a
//! session together with its derived sprint list. Every query is a pure
//! function over that snapshot; nothing is cached or mutated between calls.

pub mod forecast;
pub mod metrics;
pub mod normalize;
pub mod rollup;
pub mod sprints;

pub use forecast::{CapacityForecast, ForecastParams, VelocityTrend};
pub use metrics::SprintMetrics;
pub use rollup::{AssigneeRollup, ProjectRollup};
pub use sprints::{Sprint, SprintSummary};

use crate::models::{Category, Issue, IssueTable};
use crate::Result;
use chrono::{Local, NaiveDate};
use std::io::Read;
use std::path::Path;
use tracing::info;

use forecast::{ForecastBasis, NEXT_NEXT_SPRINT_PLACEHOLDER, NEXT_SPRINT_PLACEHOLDER, TrendPoint};

/// Sprint name used by the forecast when there are no sprints at all.
pub const UNKNOWN_SPRINT: &str = "Unknown";

/// One sprint's issues, borrowed from the table.
#[derive(Debug, Clone)]
pub struct SprintSlice<'a> {
    /// Sprint name, or a placeholder when the table has no sprints
    pub name: String,
    /// Position in the sprint list, `None` when there are no sprints
    pub index: Option<usize>,
    pub issues: Vec<&'a Issue>,
}

/// Query surface over one normalized table.
#[derive(Debug, Clone)]
pub struct SprintAnalyzer {
    table: IssueTable,
    sprints: Vec<Sprint>,
    today: NaiveDate,
    issue_url_base: Option<String>,
}

impl SprintAnalyzer {
    pub fn new(table: IssueTable) -> Self {
        let sprints = sprints::identify_sprints(&table);
        info!(rows = table.len(), sprints = sprints.len(), "loaded issue table");
        Self {
            table,
            sprints,
            today: Local::now().date_naive(),
            issue_url_base: None,
        }
    }

    /// Parse and normalize CSV text.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(normalize::normalize(reader)?))
    }

    /// Parse and normalize a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Override the reference day used for overdue checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Attach browse links to blockers in rollup views.
    pub fn with_issue_url_base(mut self, base: Option<String>) -> Self {
        self.issue_url_base = base.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn table(&self) -> &IssueTable {
        &self.table
    }

    /// Sprints in chronological order.
    pub fn sprints(&self) -> &[Sprint] {
        &self.sprints
    }

    /// The last sprint, considered in progress.
    pub fn current_sprint(&self) -> Option<&Sprint> {
        self.sprints.last()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Resolve a sprint index (negative counts from the end, out of range clamps).
    pub fn resolve_index(&self, index: isize) -> Option<usize> {
        sprints::resolve_index(self.sprints.len(), index)
    }

    /// Issues of the sprint at `index`.
    ///
    /// With no sprints at all the slice is the whole table.
    pub fn sprint_data(&self, index: isize) -> SprintSlice<'_> {
        match self.resolve_index(index) {
            Some(idx) => self.slice_at(idx),
            None => SprintSlice {
                name: metrics::NO_SPRINT_NAME.to_string(),
                index: None,
                issues: self.table.issues().iter().collect(),
            },
        }
    }

    fn slice_at(&self, idx: usize) -> SprintSlice<'_> {
        let sprint = &self.sprints[idx];
        SprintSlice {
            name: sprint.name.clone(),
            index: Some(idx),
            issues: self
                .table
                .issues()
                .iter()
                .filter(|issue| sprint.contains(issue))
                .collect(),
        }
    }

    /// Summary of every sprint, in order.
    pub fn all_sprints(&self) -> Vec<SprintSummary> {
        (0..self.sprints.len())
            .map(|idx| {
                let slice = self.slice_at(idx);
                sprints::summarize(&slice.name, &slice.issues)
            })
            .collect()
    }

    /// Metrics for one slice.
    pub fn sprint_metrics(&self, slice: &SprintSlice<'_>) -> SprintMetrics {
        metrics::calculate(
            &slice.name,
            &slice.issues,
            self.today,
            self.issue_url_base.as_deref(),
        )
    }

    /// Metrics with the sprint's listing entry attached.
    pub fn detailed_metrics(&self, index: isize) -> SprintMetrics {
        let slice = self.sprint_data(index);
        let mut metrics = self.sprint_metrics(&slice);
        if slice.index.is_some() {
            metrics.sprint_details = Some(sprints::summarize(&slice.name, &slice.issues));
        }
        metrics
    }

    fn trend_points(&self) -> Vec<TrendPoint> {
        (0..self.sprints.len())
            .map(|idx| self.slice_at(idx))
            .filter(|slice| !slice.issues.is_empty())
            .map(|slice| {
                let mut category_hours = [0.0; 4];
                for (hours, category) in category_hours.iter_mut().zip(Category::ALL) {
                    *hours = slice
                        .issues
                        .iter()
                        .filter(|i| i.category == category)
                        .map(|i| i.estimate_hours)
                        .sum();
                }
                TrendPoint {
                    sprint_name: slice.name.clone(),
                    completed_hours: completed_hours(&slice.issues),
                    category_hours,
                }
            })
            .collect()
    }

    /// Completed hours per sprint with completed work.
    pub fn velocity_trend(&self) -> VelocityTrend {
        VelocityTrend::from_points(&self.trend_points())
    }

    /// Hours scheduled into a sprint through membership.
    pub fn allocated_hours(&self, sprint: &Sprint) -> f64 {
        self.table
            .issues()
            .iter()
            .filter(|issue| sprint.contains(issue))
            .map(|issue| issue.estimate_hours)
            .sum()
    }

    /// Capacity forecast for the sprint at `params.sprint_index` and the two after it.
    pub fn project_future_capacity(&self, params: ForecastParams) -> CapacityForecast {
        let current = self.current_sprint().map(|s| s.name.as_str());
        let basis = ForecastBasis::from_points(
            &self.trend_points(),
            current,
            params.window,
            params.team_capacity,
        );

        let target = self.resolve_index(params.sprint_index);
        let ahead = |offset: usize, placeholder: &str| -> (String, f64) {
            match target.map(|idx| idx + offset).and_then(|idx| self.sprints.get(idx)) {
                Some(sprint) => (sprint.name.clone(), self.allocated_hours(sprint)),
                None => (placeholder.to_string(), 0.0),
            }
        };

        let (current_name, current_allocated) = ahead(0, UNKNOWN_SPRINT);
        let (next_name, next_allocated) = ahead(1, NEXT_SPRINT_PLACEHOLDER);
        let (after_name, after_allocated) = ahead(2, NEXT_NEXT_SPRINT_PLACEHOLDER);

        CapacityForecast {
            current_sprint: basis.sprint_forecast(0, &current_name, current_allocated),
            next_sprint: basis.sprint_forecast(1, &next_name, next_allocated),
            next_next_sprint: basis.sprint_forecast(2, &after_name, after_allocated),
            historical: basis.historical,
        }
    }

    /// Per-assignee rollup of the sprint at `index`.
    pub fn assignee_data(&self, index: isize) -> Vec<AssigneeRollup> {
        let slice = self.sprint_data(index);
        rollup::by_assignee(&slice.issues, self.today, self.issue_url_base.as_deref())
    }

    /// Per-project rollup of the sprint at `index`.
    pub fn project_data(&self, index: isize) -> Vec<ProjectRollup> {
        let slice = self.sprint_data(index);
        rollup::by_project(&slice.issues, self.today, self.issue_url_base.as_deref())
    }

    /// Distinct issue types in first-appearance order.
    pub fn issue_types(&self) -> Vec<String> {
        self.table.issue_types()
    }
}

/// Sum of estimates.
pub fn total_hours(issues: &[&Issue]) -> f64 {
    issues.iter().map(|i| i.estimate_hours).sum()
}

/// Sum of estimates over done issues.
pub fn completed_hours(issues: &[&Issue]) -> f64 {
    issues
        .iter()
        .filter(|i| i.is_done())
        .map(|i| i.estimate_hours)
        .sum()
}

/// `part` as a percentage of `total`, 0 when `total` is not positive.
pub fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

/// Group issues by key in first-appearance order, skipping issues without one.
pub fn group_ordered<'a, K: PartialEq>(
    issues: &[&'a Issue],
    key: impl Fn(&Issue) -> Option<K>,
) -> Vec<(K, Vec<&'a Issue>)> {
    let mut groups: Vec<(K, Vec<&'a Issue>)> = Vec::new();
    for issue in issues {
        let Some(k) = key(issue) else {
            continue;
        };
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(issue),
            None => groups.push((k, vec![issue])),
        }
    }
    groups
}
