//! Archived report commands.

use super::analytics::build_dashboard;
use super::{Context, Output, json};
use crate::{Error, Result};
use crate::models::report::ARCHIVE_TIMESTAMP_FORMAT;
use crate::models::{Report, ReportSummary};
use crate::storage::ReportStore;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

fn store(ctx: &Context) -> ReportStore {
    ReportStore::new(ctx.storage.reports_dir())
}

/// The session to search first, if one is selected.
fn preferred_session(ctx: &Context) -> Result<Option<String>> {
    match ctx.session() {
        Ok(session) => Ok(Some(session.id)),
        Err(Error::NoSession) => Ok(None),
        Err(e) => Err(e),
    }
}

#[derive(Serialize)]
pub struct ArchiveCreated {
    pub archive_id: String,
    pub session: String,
    pub sprint_name: String,
    pub date_archived: String,
    pub path: PathBuf,
}

impl Output for ArchiveCreated {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Archived {} as {} ({})",
            self.sprint_name, self.archive_id, self.date_archived
        )
    }
}

/// Snapshot one sprint's analytics into the archive.
pub fn archive_create(ctx: &Context, sprint: isize) -> Result<ArchiveCreated> {
    let (session, analyzer) = ctx.analyzer()?;
    let dashboard = build_dashboard(ctx, &analyzer, sprint);
    let mut metrics = dashboard.metrics.clone();
    metrics.sprint_details = dashboard.current_sprint_details.clone();

    let report = Report {
        archive_id: uuid::Uuid::new_v4().to_string(),
        date_archived: Local::now().format(ARCHIVE_TIMESTAMP_FORMAT).to_string(),
        metrics,
        dashboard,
        assignees: analyzer.assignee_data(sprint),
        projects: analyzer.project_data(sprint),
    };

    let path = store(ctx).save(&session.id, &report)?;
    info!(id = %report.archive_id, sprint = %report.metrics.sprint_name, "archived sprint report");
    Ok(ArchiveCreated {
        archive_id: report.archive_id,
        session: session.id,
        sprint_name: report.metrics.sprint_name,
        date_archived: report.date_archived,
        path,
    })
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: Vec<ReportSummary>,
    pub count: usize,
}

impl Output for ReportList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.reports.is_empty() {
            return "No archived reports.".to_string();
        }
        let mut lines = vec![format!("{} archived report(s):", self.count)];
        for r in &self.reports {
            lines.push(format!("  {}  {}  {}", r.date_archived, r.id, r.sprint_name));
        }
        lines.join("\n")
    }
}

/// List the session's archived reports, newest first.
pub fn archive_list(ctx: &Context) -> Result<ReportList> {
    let session = ctx.session()?;
    let reports = store(ctx).list(&session.id)?;
    Ok(ReportList {
        count: reports.len(),
        reports,
    })
}

impl Output for Report {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Report {} archived {}\n\n{}",
            self.archive_id,
            self.date_archived,
            self.dashboard.to_human()
        )
    }
}

/// Show a report, looking in the current session first and then all others.
pub fn archive_show(ctx: &Context, id: &str) -> Result<Report> {
    let session = preferred_session(ctx)?;
    let (_, report) = store(ctx).get_or_find(session.as_deref(), id)?;
    Ok(report)
}

#[derive(Serialize)]
pub struct ArchiveDeleted {
    pub id: String,
    pub deleted: bool,
}

impl Output for ArchiveDeleted {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted report {}", self.id)
    }
}

/// Delete a report from whichever session holds it.
pub fn archive_delete(ctx: &Context, id: &str) -> Result<ArchiveDeleted> {
    let session = preferred_session(ctx)?;
    let mut store = store(ctx);
    let (owner, _) = store.get_or_find(session.as_deref(), id)?;
    store.delete(&owner, id)?;
    Ok(ArchiveDeleted {
        id: id.to_string(),
        deleted: true,
    })
}
