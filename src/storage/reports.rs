//! Archived report store.
//!
//! Reports are one JSON file each at `<data>/reports/<session>/<id>.json`,
//! written atomically and never modified afterwards.

use crate::models::{Report, ReportSummary};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::validate_id;

/// Keyed store of archived reports with an in-process read cache.
#[derive(Debug)]
pub struct ReportStore {
    root: PathBuf,
    cache: HashMap<(String, String), Report>,
}

impl ReportStore {
    /// Create a store rooted at a reports directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.root.join(session)
    }

    fn report_path(&self, session: &str, id: &str) -> PathBuf {
        self.session_dir(session).join(format!("{}.json", id))
    }

    /// Write a report. Fails if one with the same id already exists.
    pub fn save(&mut self, session: &str, report: &Report) -> Result<PathBuf> {
        validate_id("session", session)?;
        validate_id("report", &report.archive_id)?;

        let dir = self.session_dir(session);
        fs::create_dir_all(&dir)?;
        let path = self.report_path(session, &report.archive_id);
        if path.exists() {
            return Err(Error::InvalidInput(format!(
                "Report already exists: {}",
                report.archive_id
            )));
        }

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, report)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;

        debug!(session, id = %report.archive_id, "archived report");
        self.cache.insert(
            (session.to_string(), report.archive_id.clone()),
            report.clone(),
        );
        Ok(path)
    }

    /// Get a report from one session.
    pub fn get(&mut self, session: &str, id: &str) -> Result<Report> {
        validate_id("session", session)?;
        validate_id("report", id)?;

        let key = (session.to_string(), id.to_string());
        if let Some(report) = self.cache.get(&key) {
            return Ok(report.clone());
        }

        let path = self.report_path(session, id);
        if !path.exists() {
            return Err(Error::NotFound(format!("Report not found: {}", id)));
        }
        let report = read_report(&path)?;
        self.cache.insert(key, report.clone());
        Ok(report)
    }

    /// Find a report in any session. Returns the owning session id with it.
    pub fn find_any(&mut self, id: &str) -> Result<(String, Report)> {
        validate_id("report", id)?;
        for session in self.sessions()? {
            if self.report_path(&session, id).exists() {
                let report = self.get(&session, id)?;
                return Ok((session, report));
            }
        }
        Err(Error::NotFound(format!("Report not found: {}", id)))
    }

    /// Look in `session` first, then everywhere else.
    pub fn get_or_find(&mut self, session: Option<&str>, id: &str) -> Result<(String, Report)> {
        if let Some(session) = session {
            match self.get(session, id) {
                Ok(report) => return Ok((session.to_string(), report)),
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.find_any(id)
    }

    /// Session ids that have a reports directory.
    fn sessions(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                sessions.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// List a session's reports, newest first. Unreadable files are skipped.
    pub fn list(&self, session: &str) -> Result<Vec<ReportSummary>> {
        validate_id("session", session)?;
        let dir = self.session_dir(session);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_report(&path) {
                Ok(report) => summaries.push(report.summary()),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable report"),
            }
        }
        summaries.sort_by(|a, b| {
            b.date_archived
                .cmp(&a.date_archived)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(summaries)
    }

    /// Delete a report from a session.
    pub fn delete(&mut self, session: &str, id: &str) -> Result<()> {
        validate_id("session", session)?;
        validate_id("report", id)?;
        let path = self.report_path(session, id);
        self.cache.remove(&(session.to_string(), id.to_string()));
        if !path.exists() {
            return Err(Error::NotFound(format!("Report not found: {}", id)));
        }
        fs::remove_file(&path)?;
        debug!(session, id, "deleted report");
        Ok(())
    }
}

fn read_report(path: &Path) -> Result<Report> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::ForecastParams;
    use crate::models::Dashboard;
    use crate::test_utils::{Row, TestEnv, analyzer};

    fn report(id: &str, date: &str) -> Report {
        let a = analyzer(&[
            Row::new("A-1", "Done", "Sprint 1"),
            Row::new("A-2", "To Do", "Sprint 1"),
        ]);
        let metrics = a.detailed_metrics(-1);
        Report {
            archive_id: id.to_string(),
            date_archived: date.to_string(),
            metrics: metrics.clone(),
            dashboard: Dashboard {
                metrics,
                velocity: a.velocity_trend(),
                forecast: a.project_future_capacity(ForecastParams::default()),
                current_sprint_details: a.all_sprints().pop(),
            },
            assignees: a.assignee_data(-1),
            projects: a.project_data(-1),
        }
    }

    #[test]
    fn test_save_then_get_roundtrip() {
        let env = TestEnv::new();
        let mut store = ReportStore::new(env.storage().reports_dir());
        let original = report("r1", "2024-05-01 10:00:00");
        store.save("s1", &original).unwrap();

        // A fresh store reads from disk rather than the cache.
        let mut fresh = ReportStore::new(env.storage().reports_dir());
        let loaded = fresh.get("s1", "r1").unwrap();
        assert_eq!(loaded.metrics.sprint_name, "Sprint 1");
        assert_eq!(loaded.metrics, original.metrics);
        assert_eq!(loaded.assignees, original.assignees);
        assert_eq!(loaded.dashboard.velocity, original.dashboard.velocity);
    }

    #[test]
    fn test_delete_then_not_found() {
        let env = TestEnv::new();
        let mut store = ReportStore::new(env.storage().reports_dir());
        store.save("s1", &report("r1", "2024-05-01 10:00:00")).unwrap();
        store.get("s1", "r1").unwrap();

        store.delete("s1", "r1").unwrap();
        assert!(matches!(store.get("s1", "r1"), Err(Error::NotFound(_))));
        assert!(matches!(store.delete("s1", "r1"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_newest_first_and_skips_garbage() {
        let env = TestEnv::new();
        let reports_dir = env.storage().reports_dir();
        let mut store = ReportStore::new(&reports_dir);
        store.save("s1", &report("old", "2024-05-01 10:00:00")).unwrap();
        store.save("s1", &report("new", "2024-06-01 09:00:00")).unwrap();
        fs::write(reports_dir.join("s1").join("broken.json"), "{not json").unwrap();

        let listed = store.list("s1").unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(listed[0].sprint_name, "Sprint 1");
        assert!(store.list("empty").unwrap().is_empty());
    }

    #[test]
    fn test_find_in_other_session() {
        let env = TestEnv::new();
        let mut store = ReportStore::new(env.storage().reports_dir());
        store.save("s1", &report("r1", "2024-05-01 10:00:00")).unwrap();

        let (session, found) = store.get_or_find(Some("s2"), "r1").unwrap();
        assert_eq!(session, "s1");
        assert_eq!(found.archive_id, "r1");
        assert!(matches!(
            store.get_or_find(Some("s2"), "missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let env = TestEnv::new();
        let mut store = ReportStore::new(env.storage().reports_dir());
        store.save("s1", &report("r1", "2024-05-01 10:00:00")).unwrap();
        assert!(store.save("s1", &report("r1", "2024-05-02 10:00:00")).is_err());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let env = TestEnv::new();
        let mut store = ReportStore::new(env.storage().reports_dir());
        assert!(matches!(
            store.get("s1", "../secret"),
            Err(Error::InvalidInput(_))
        ));
    }
}
