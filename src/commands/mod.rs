//! Command implementations for the Sprintcast CLI.
//!
//! This module contains the business logic for each CLI command:
//! - `load` and `session_*` - Session lifecycle
//! - [`analytics`] - Sprint listings, metrics, rollups and forecasts
//! - [`archive`] - Archived report management
//! - `config_*` - Configuration inspection and updates
//!
//! Every command returns a value implementing [`Output`], which `main`
//! prints as JSON or human-readable text.

pub mod analytics;
pub mod archive;

pub use analytics::{
    AssigneeList, IssueTypeList, ProjectList, SprintList, assignees, dashboard, forecast,
    issue_types, metrics, projects, sprints, velocity,
};
pub use archive::{
    ArchiveCreated, ArchiveDeleted, ReportList, archive_create, archive_delete, archive_list,
    archive_show,
};

use crate::analytics::SprintAnalyzer;
use crate::config::{self, ConfigOverrides, ResolvedConfig, SprintcastConfig};
use crate::storage::{SessionInfo, Storage};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a result, falling back to an error object.
pub(crate) fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {}"}}"#, e))
}

/// Everything a command needs: storage, resolved config, and the session choice.
#[derive(Debug, Clone)]
pub struct Context {
    pub storage: Storage,
    pub config: ResolvedConfig,
    /// Explicit `--session` value, if any
    pub session: Option<String>,
}

impl Context {
    /// Resolve configuration for a command run.
    pub fn new(storage: Storage, session: Option<String>, overrides: &ConfigOverrides) -> Result<Self> {
        let config = config::resolve_config(&storage, overrides)?;
        Ok(Self {
            storage,
            config,
            session,
        })
    }

    /// The session this command operates on.
    pub fn session(&self) -> Result<SessionInfo> {
        self.storage.resolve_session(self.session.as_deref())
    }

    /// Open the session's analyzer with configured issue links.
    pub fn analyzer(&self) -> Result<(SessionInfo, SprintAnalyzer)> {
        let session = self.session()?;
        let analyzer = self
            .storage
            .open_analyzer(&session)?
            .with_issue_url_base(self.config.issue_url_base().map(str::to_string));
        Ok((session, analyzer))
    }
}

// === Sessions ===

#[derive(Debug, Serialize)]
pub struct LoadResult {
    #[serde(flatten)]
    pub session: SessionInfo,
    /// Expired sessions removed while loading
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pruned: Vec<String>,
}

impl Output for LoadResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Loaded {} ({})", self.session.source_file, self.session.id),
            format!(
                "  {} issues across {} sprints",
                self.session.row_count, self.session.sprint_count
            ),
        ];
        if !self.pruned.is_empty() {
            lines.push(format!("  Pruned {} expired session(s)", self.pruned.len()));
        }
        lines.join("\n")
    }
}

/// Load an export into a new current session, pruning expired sessions first.
pub fn load(ctx: &Context, file: &Path) -> Result<LoadResult> {
    if !file.exists() {
        return Err(Error::NotFound(format!("File not found: {}", file.display())));
    }
    let pruned = ctx
        .storage
        .prune_sessions(ctx.config.session_ttl_hours(), Utc::now())?;
    let session = ctx.storage.create_session(file)?;
    Ok(LoadResult { session, pruned })
}

#[derive(Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionInfo>,
    pub current: Option<String>,
    pub count: usize,
}

impl Output for SessionList {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.sessions.is_empty() {
            return "No sessions. Run `sc load <file.csv>` to create one.".to_string();
        }
        let mut lines = vec![format!("{} session(s):", self.count)];
        for s in &self.sessions {
            let marker = if self.current.as_deref() == Some(s.id.as_str()) {
                "*"
            } else {
                " "
            };
            lines.push(format!(
                "{} {}  {}  {} issues, {} sprints  {}",
                marker,
                s.id,
                s.created_at.format("%Y-%m-%d %H:%M"),
                s.row_count,
                s.sprint_count,
                s.source_file
            ));
        }
        lines.join("\n")
    }
}

pub fn session_list(ctx: &Context) -> Result<SessionList> {
    let sessions = ctx.storage.list_sessions()?;
    Ok(SessionList {
        count: sessions.len(),
        current: ctx.storage.current_session_id()?,
        sessions,
    })
}

#[derive(Serialize)]
pub struct SessionShow {
    #[serde(flatten)]
    pub session: SessionInfo,
    pub current: bool,
}

impl Output for SessionShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let s = &self.session;
        [
            format!("Session {}{}", s.id, if self.current { " (current)" } else { "" }),
            format!("  Source:  {}", s.source_file),
            format!("  Created: {}", s.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("  Issues:  {}", s.row_count),
            format!("  Sprints: {}", s.sprint_count),
        ]
        .join("\n")
    }
}

pub fn session_show(ctx: &Context) -> Result<SessionShow> {
    let session = ctx.session()?;
    let current = ctx.storage.current_session_id()?.as_deref() == Some(session.id.as_str());
    Ok(SessionShow { session, current })
}

#[derive(Serialize)]
pub struct SessionRemoved {
    pub id: String,
    pub removed: bool,
}

impl Output for SessionRemoved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Removed session {}", self.id)
    }
}

pub fn session_remove(ctx: &Context, id: &str) -> Result<SessionRemoved> {
    ctx.storage.remove_session(id)?;
    Ok(SessionRemoved {
        id: id.to_string(),
        removed: true,
    })
}

#[derive(Serialize)]
pub struct PruneResult {
    pub removed: Vec<String>,
    pub ttl_hours: u64,
}

impl Output for PruneResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.removed.is_empty() {
            format!("No sessions older than {} hours", self.ttl_hours)
        } else {
            format!(
                "Removed {} session(s) older than {} hours",
                self.removed.len(),
                self.ttl_hours
            )
        }
    }
}

pub fn session_prune(ctx: &Context) -> Result<PruneResult> {
    let ttl_hours = ctx.config.session_ttl_hours();
    let removed = ctx.storage.prune_sessions(ttl_hours, Utc::now())?;
    info!(count = removed.len(), "pruned sessions");
    Ok(PruneResult { removed, ttl_hours })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigShow {
    #[serde(flatten)]
    pub config: ResolvedConfig,
    pub local_path: PathBuf,
    pub system_path: Option<PathBuf>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let unset = |source: Option<String>| source.unwrap_or_else(|| "unset".to_string());
        let mut lines = vec![
            format!(
                "output-format      {} ({})",
                c.output_format.value, c.output_format.source
            ),
            format!("window             {} ({})", c.window.value, c.window.source),
            format!(
                "team-capacity      {}",
                unset(
                    c.team_capacity
                        .as_ref()
                        .map(|r| format!("{} ({})", r.value, r.source))
                )
            ),
            format!(
                "session-ttl-hours  {} ({})",
                c.session_ttl_hours.value, c.session_ttl_hours.source
            ),
            format!(
                "issue-url-base     {}",
                unset(
                    c.issue_url_base
                        .as_ref()
                        .map(|r| format!("{} ({})", r.value, r.source))
                )
            ),
            String::new(),
            format!("Local config:  {}", self.local_path.display()),
        ];
        if let Some(ref path) = self.system_path {
            lines.push(format!("System config: {}", path.display()));
        }
        lines.join("\n")
    }
}

pub fn config_show(ctx: &Context) -> Result<ConfigShow> {
    Ok(ConfigShow {
        config: ctx.config.clone(),
        local_path: ctx.storage.config_path(),
        system_path: Storage::system_config_path(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} in {}", self.key, self.value, self.path.display())
    }
}

/// Validate and write one key to the local config.kdl.
pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<ConfigSet> {
    let mut local: SprintcastConfig = ctx.storage.read_config()?;
    local.set(key, value).map_err(Error::Config)?;
    ctx.storage.write_config(&local)?;
    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        path: ctx.storage.config_path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Row, TestEnv};

    pub(crate) fn context(env: &TestEnv) -> Context {
        Context {
            storage: env.storage(),
            config: ResolvedConfig::default(),
            session: None,
        }
    }

    #[test]
    fn test_load_then_show_session() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let csv = env.write_csv("export.csv", &[Row::new("A-1", "Done", "Sprint 1")]);

        let loaded = load(&ctx, &csv).unwrap();
        assert_eq!(loaded.session.row_count, 1);
        let json: serde_json::Value = serde_json::from_str(&loaded.to_json()).unwrap();
        assert_eq!(json["sprint_count"], 1);
        assert!(json.get("pruned").is_none());

        let shown = session_show(&ctx).unwrap();
        assert!(shown.current);
        assert_eq!(shown.session.id, loaded.session.id);
        assert!(shown.to_human().contains("(current)"));
    }

    #[test]
    fn test_load_missing_file() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let err = load(&ctx, &env.data_path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_session_list_marks_current() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let csv = env.write_csv("export.csv", &[Row::new("A-1", "Done", "Sprint 1")]);
        load(&ctx, &csv).unwrap();
        let second = load(&ctx, &csv).unwrap();

        let list = session_list(&ctx).unwrap();
        assert_eq!(list.count, 2);
        assert_eq!(list.current, Some(second.session.id.clone()));
        assert!(list.to_human().contains(&format!("* {}", second.session.id)));
    }

    #[test]
    fn test_config_set_writes_local_file() {
        let env = TestEnv::new();
        let ctx = context(&env);
        config_set(&ctx, "window", "6").unwrap();
        assert_eq!(ctx.storage.read_config().unwrap().window, Some(6));

        let err = config_set(&ctx, "window", "zero").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_show_human() {
        let env = TestEnv::new();
        let ctx = context(&env);
        let shown = config_show(&ctx).unwrap();
        let human = shown.to_human();
        assert!(human.contains("window             4 (default)"));
        assert!(human.contains("team-capacity      unset"));
        let json: serde_json::Value = serde_json::from_str(&shown.to_json()).unwrap();
        assert_eq!(json["window"]["source"], "default");
    }
}
