//! Analytic commands over the current session.

use super::{Context, Output, json};
use crate::Result;
use crate::analytics::forecast::SprintForecast;
use crate::analytics::{
    AssigneeRollup, CapacityForecast, ForecastParams, ProjectRollup, SprintAnalyzer,
    SprintMetrics, SprintSummary, VelocityTrend, sprints::summarize,
};
use crate::models::{Blocker, Category, Dashboard};
use serde::Serialize;
use std::fmt::Write as _;

fn blocker_line(b: &Blocker) -> String {
    let mut line = format!("  [{}] {} {} ({})", b.blocker_type, b.issue_key, b.summary, b.status);
    if let Some(ref due) = b.due_date {
        let _ = write!(line, " due {}", due);
    }
    if let Some(ref url) = b.issue_url {
        let _ = write!(line, " {}", url);
    }
    line
}

// === sprints ===

#[derive(Serialize)]
pub struct SprintList {
    pub sprints: Vec<SprintSummary>,
    pub count: usize,
}

impl Output for SprintList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.sprints.is_empty() {
            return "No sprints found.".to_string();
        }
        let mut lines = vec![format!("{} sprint(s):", self.count)];
        for s in &self.sprints {
            let mut line = format!(
                "  {}: {:.1}/{:.1} hrs ({:.1}%)",
                s.name, s.completed_points, s.total_points, s.utilization
            );
            if let Some(end) = s.end_date {
                let _ = write!(line, " ends {}", end.format("%d %b %Y"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

pub fn sprints(ctx: &Context) -> Result<SprintList> {
    let (_, analyzer) = ctx.analyzer()?;
    let sprints = analyzer.all_sprints();
    Ok(SprintList {
        count: sprints.len(),
        sprints,
    })
}

// === metrics ===

impl Output for SprintMetrics {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("{} ({})", self.sprint_name, self.sprint_status),
            format!(
                "  Completed {:.1} of {:.1} hrs ({:.1}%)",
                self.completed_story_points, self.total_story_points, self.completion_percentage
            ),
        ];
        let categories: Vec<String> = Category::ALL
            .iter()
            .map(|c| format!("{} {:.1}", c, self.category_hours(*c)))
            .collect();
        lines.push(format!("  Hours: {}", categories.join(", ")));

        if !self.resource_utilization.is_empty() {
            lines.push("  Assignees:".to_string());
            for r in &self.resource_utilization {
                lines.push(format!(
                    "    {}: {:.1}/{:.1} hrs ({:.1}%)",
                    r.assignee, r.completed_points, r.total_points, r.completion_rate
                ));
            }
        }

        if self.blockers.is_empty() {
            lines.push("  No blockers".to_string());
        } else {
            lines.push(format!("  {} blocker(s):", self.blockers.len()));
            lines.extend(self.blockers.iter().map(blocker_line));
        }
        lines.join("\n")
    }
}

pub fn metrics(ctx: &Context, sprint: isize) -> Result<SprintMetrics> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(analyzer.sprint_metrics(&analyzer.sprint_data(sprint)))
}

// === velocity ===

impl Output for VelocityTrend {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.sprint_names.is_empty() {
            return "No sprints with completed work.".to_string();
        }
        let mut lines = vec!["Velocity (completed hours):".to_string()];
        for (name, hours) in self.sprint_names.iter().zip(&self.velocities) {
            lines.push(format!("  {}: {:.1}", name, hours));
        }
        lines.join("\n")
    }
}

pub fn velocity(ctx: &Context) -> Result<VelocityTrend> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(analyzer.velocity_trend())
}

// === forecast ===

fn forecast_lines(label: &str, f: &SprintForecast) -> Vec<String> {
    let breakdown: Vec<String> = f
        .category_breakdown
        .iter()
        .map(|(c, h)| format!("{} {:.1}", c, h))
        .collect();
    vec![
        format!("{} - {}", label, f.sprint_name),
        format!(
            "  Forecast {:.1} hrs, allocated {:.1}, unallocated {:.1} ({:.1}% of capacity)",
            f.forecast_hours, f.allocated_hours, f.unallocated_hours, f.remaining_percentage
        ),
        format!("  By category: {}", breakdown.join(", ")),
    ]
}

impl Output for CapacityForecast {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let h = &self.historical;
        let mut lines = vec![format!(
            "Capacity {:.1} hrs, historical utilization {:.1}%, based on {} sprint(s)",
            self.current_sprint.team_capacity,
            self.current_sprint.historical_utilization,
            h.sprint_count
        )];
        lines.push(format!(
            "Average velocity {:.1} hrs, moving average {:.1} hrs",
            h.avg_velocity, h.latest_moving_avg
        ));
        if let Some(ref warning) = h.data_quality_warning {
            lines.push(format!("Warning: {}", warning));
        }
        lines.extend(forecast_lines("This sprint", &self.current_sprint));
        lines.extend(forecast_lines("Next sprint", &self.next_sprint));
        lines.extend(forecast_lines("Sprint after next", &self.next_next_sprint));
        lines.join("\n")
    }
}

pub fn forecast(ctx: &Context, sprint: isize) -> Result<CapacityForecast> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(analyzer.project_future_capacity(forecast_params(ctx, sprint)))
}

fn forecast_params(ctx: &Context, sprint: isize) -> ForecastParams {
    ForecastParams {
        window: ctx.config.window(),
        team_capacity: ctx.config.team_capacity(),
        sprint_index: sprint,
    }
}

// === rollups ===

#[derive(Serialize)]
pub struct AssigneeList {
    pub sprint_name: String,
    pub assignees: Vec<AssigneeRollup>,
}

impl Output for AssigneeList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.assignees.is_empty() {
            return format!("{}: no assigned work", self.sprint_name);
        }
        let mut lines = vec![format!("{} - {} assignee(s)", self.sprint_name, self.assignees.len())];
        for a in &self.assignees {
            lines.push(format!(
                "{}: {} task(s), {:.1}/{:.1} hrs ({:.1}%)",
                a.name, a.total_tasks, a.completed_points, a.total_points, a.completion_percentage
            ));
            lines.extend(a.blockers.iter().map(blocker_line));
        }
        lines.join("\n")
    }
}

pub fn assignees(ctx: &Context, sprint: isize) -> Result<AssigneeList> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(AssigneeList {
        sprint_name: analyzer.sprint_data(sprint).name,
        assignees: analyzer.assignee_data(sprint),
    })
}

#[derive(Serialize)]
pub struct ProjectList {
    pub sprint_name: String,
    pub projects: Vec<ProjectRollup>,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return format!("{}: no projects", self.sprint_name);
        }
        let mut lines = vec![format!("{} - {} project(s)", self.sprint_name, self.projects.len())];
        for p in &self.projects {
            lines.push(format!(
                "{}: {} task(s), {:.1}/{:.1} hrs ({:.1}%), team: {}",
                p.name,
                p.total_tasks,
                p.completed_points,
                p.total_points,
                p.completion_percentage,
                p.team_members.join(", ")
            ));
            lines.extend(p.blockers.iter().map(blocker_line));
        }
        lines.join("\n")
    }
}

pub fn projects(ctx: &Context, sprint: isize) -> Result<ProjectList> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(ProjectList {
        sprint_name: analyzer.sprint_data(sprint).name,
        projects: analyzer.project_data(sprint),
    })
}

// === dashboard ===

impl Output for Dashboard {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        [
            self.metrics.to_human(),
            String::new(),
            self.velocity.to_human(),
            String::new(),
            self.forecast.to_human(),
        ]
        .join("\n")
    }
}

/// Build the dashboard payload for a sprint.
pub fn build_dashboard(ctx: &Context, analyzer: &SprintAnalyzer, sprint: isize) -> Dashboard {
    let slice = analyzer.sprint_data(sprint);
    let current_sprint_details = slice
        .index
        .map(|_| summarize(&slice.name, &slice.issues));
    Dashboard {
        metrics: analyzer.sprint_metrics(&slice),
        velocity: analyzer.velocity_trend(),
        forecast: analyzer.project_future_capacity(forecast_params(ctx, sprint)),
        current_sprint_details,
    }
}

pub fn dashboard(ctx: &Context, sprint: isize) -> Result<Dashboard> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(build_dashboard(ctx, &analyzer, sprint))
}

// === issue types ===

#[derive(Serialize)]
pub struct IssueTypeList {
    pub issue_types: Vec<String>,
}

impl Output for IssueTypeList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.issue_types.is_empty() {
            "No issue types.".to_string()
        } else {
            self.issue_types.join("\n")
        }
    }
}

pub fn issue_types(ctx: &Context) -> Result<IssueTypeList> {
    let (_, analyzer) = ctx.analyzer()?;
    Ok(IssueTypeList {
        issue_types: analyzer.issue_types(),
    })
}
