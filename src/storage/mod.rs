//! Storage layer for Sprintcast data.
//!
//! Everything lives under one data directory (`$SC_DATA_DIR`, else the
//! platform data dir + `sprintcast`):
//!
//! ```text
//! <data>/
//!   config.kdl                 local preferences
//!   current                    id of the current session
//!   sessions/<id>/session.json session metadata
//!   sessions/<id>/issues.csv   the loaded export, kept verbatim
//!   reports/<session>/<id>.json archived reports
//! ```
//!
//! A session's CSV is the immutable snapshot; it is re-normalized on every
//! command rather than cached in a derived form.

pub mod reports;

pub use reports::ReportStore;

use crate::analytics::SprintAnalyzer;
use crate::config::{SprintcastConfig, parse_config};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SC_DATA_DIR";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "SC_CONFIG_DIR";

const SESSION_FILE: &str = "session.json";
const SESSION_CSV: &str = "issues.csv";
const CURRENT_FILE: &str = "current";
const CONFIG_FILE: &str = "config.kdl";
const STAGING_PREFIX: &str = ".staging-";

/// Get the data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(base.join("sprintcast"))
}

/// Get the system config directory, if one can be determined.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    dirs::config_dir().map(|d| d.join("sprintcast"))
}

/// Reject ids that could escape their directory.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid {} id: {:?}", kind, id)))
    }
}

/// Metadata for a loaded export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Path the export was loaded from
    pub source_file: String,
    pub row_count: usize,
    pub sprint_count: usize,
}

impl SessionInfo {
    /// Returns true if the session is older than `ttl_hours` at `now`.
    pub fn is_expired(&self, ttl_hours: u64, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at).num_seconds();
        age > 0 && age as u64 > ttl_hours.saturating_mul(3600)
    }
}

/// Storage manager rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Root data directory
    pub root: PathBuf,
}

impl Storage {
    /// Open storage at the default data directory.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?)
    }

    /// Open or create storage at the given directory.
    pub fn open_at(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join("sessions"))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn session_dir(&self, id: &str) -> PathBuf {
        self.sessions_dir().join(id)
    }

    /// Path of a session's stored export.
    pub fn session_csv(&self, id: &str) -> PathBuf {
        self.session_dir(id).join(SESSION_CSV)
    }

    // === Sessions ===

    /// Load an export into a new session and make it current.
    ///
    /// The file is fully parsed first; a schema error leaves nothing behind.
    pub fn create_session(&self, source: &Path) -> Result<SessionInfo> {
        let analyzer = SprintAnalyzer::from_path(source)?;

        let info = SessionInfo {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source_file: source.display().to_string(),
            row_count: analyzer.table().len(),
            sprint_count: analyzer.sprints().len(),
        };

        // Files are written into a staging dir that is renamed into place once
        // complete; the staging dir is removed on drop if anything fails.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(self.sessions_dir())?;
        fs::copy(source, staging.path().join(SESSION_CSV))?;
        fs::write(
            staging.path().join(SESSION_FILE),
            serde_json::to_string_pretty(&info)?,
        )?;

        let dir = self.session_dir(&info.id);
        fs::rename(staging.path(), &dir)?;
        if let Err(e) = self.set_current_session(&info.id) {
            fs::remove_dir_all(&dir)?;
            return Err(e);
        }

        info!(session = %info.id, rows = info.row_count, sprints = info.sprint_count, "created session");
        Ok(info)
    }

    /// Get one session's metadata.
    pub fn get_session(&self, id: &str) -> Result<SessionInfo> {
        validate_id("session", id)?;
        let path = self.session_dir(id).join(SESSION_FILE);
        if !path.exists() {
            return Err(Error::NotFound(format!("Session not found: {}", id)));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// List sessions, newest first. Unreadable entries are skipped.
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(self.sessions_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            if id.starts_with(STAGING_PREFIX) {
                continue;
            }
            match self.get_session(&id) {
                Ok(info) => sessions.push(info),
                Err(e) => warn!(session = %id, error = %e, "skipping unreadable session"),
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Remove a session. Its archived reports are kept.
    pub fn remove_session(&self, id: &str) -> Result<()> {
        validate_id("session", id)?;
        let dir = self.session_dir(id);
        if !dir.exists() {
            return Err(Error::NotFound(format!("Session not found: {}", id)));
        }
        fs::remove_dir_all(&dir)?;
        if self.current_session_id()?.as_deref() == Some(id) {
            fs::remove_file(self.root.join(CURRENT_FILE))?;
        }
        info!(session = %id, "removed session");
        Ok(())
    }

    /// Remove sessions older than `ttl_hours`. Returns the removed ids.
    pub fn prune_sessions(&self, ttl_hours: u64, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for info in self.list_sessions()? {
            if info.is_expired(ttl_hours, now) {
                self.remove_session(&info.id)?;
                removed.push(info.id);
            }
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), ttl_hours, "pruned expired sessions");
        }
        Ok(removed)
    }

    /// Id of the current session, if one is set.
    pub fn current_session_id(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let id = fs::read_to_string(&path)?.trim().to_string();
        Ok(Some(id).filter(|id| !id.is_empty()))
    }

    pub fn set_current_session(&self, id: &str) -> Result<()> {
        validate_id("session", id)?;
        fs::write(self.root.join(CURRENT_FILE), id)?;
        Ok(())
    }

    /// Resolve the session a command operates on.
    ///
    /// An explicit id wins; otherwise the current session is used.
    pub fn resolve_session(&self, explicit: Option<&str>) -> Result<SessionInfo> {
        match explicit {
            Some(id) => self.get_session(id),
            None => match self.current_session_id()? {
                Some(id) => self.get_session(&id).map_err(|e| match e {
                    Error::NotFound(_) => Error::NoSession,
                    other => other,
                }),
                None => Err(Error::NoSession),
            },
        }
    }

    /// Re-normalize a session's export.
    pub fn open_analyzer(&self, session: &SessionInfo) -> Result<SprintAnalyzer> {
        SprintAnalyzer::from_path(&self.session_csv(&session.id))
    }

    // === Config ===

    /// Path to the local config.kdl.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Read the local config (empty if absent).
    pub fn read_config(&self) -> Result<SprintcastConfig> {
        read_config_file(&self.config_path())
    }

    /// Write the local config.
    pub fn write_config(&self, config: &SprintcastConfig) -> Result<()> {
        write_config_file(&self.config_path(), config)
    }

    /// Path to the system config.kdl, if a config directory exists.
    pub fn system_config_path() -> Option<PathBuf> {
        config_dir().map(|d| d.join(CONFIG_FILE))
    }

    /// Read the system config (empty if absent).
    pub fn read_system_config() -> Result<SprintcastConfig> {
        match Self::system_config_path() {
            Some(path) => read_config_file(&path),
            None => Ok(SprintcastConfig::default()),
        }
    }

    /// Write the system config.
    pub fn write_system_config(config: &SprintcastConfig) -> Result<()> {
        let path = Self::system_config_path()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        write_config_file(&path, config)
    }
}

fn read_config_file(path: &Path) -> Result<SprintcastConfig> {
    if !path.exists() {
        return Ok(SprintcastConfig::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_config(&content))
}

fn write_config_file(path: &Path, config: &SprintcastConfig) -> Result<()> {
    config.validate().map_err(Error::Config)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;
    Ok(())
}
