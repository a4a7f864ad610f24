//! Unified precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Data-dir config.kdl (`<data>/config.kdl`)
//! 3. System config.kdl (`~/.config/sprintcast/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::analytics::forecast::DEFAULT_WINDOW;
use crate::config::{OutputFormat, SprintcastConfig};
use crate::storage::Storage;
use serde::Serialize;

/// Sessions older than this many hours are pruned by default (one week).
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 168;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from the data-dir config.kdl
    Local,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Local => write!(f, "local"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub window: Resolved<usize>,
    /// Unset means "estimate from history"
    pub team_capacity: Option<Resolved<f64>>,
    pub session_ttl_hours: Resolved<u64>,
    pub issue_url_base: Option<Resolved<String>>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            window: Resolved::new(DEFAULT_WINDOW, ValueSource::Default),
            team_capacity: None,
            session_ttl_hours: Resolved::new(DEFAULT_SESSION_TTL_HOURS, ValueSource::Default),
            issue_url_base: None,
        }
    }
}

impl ResolvedConfig {
    /// Get the output format value.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn window(&self) -> usize {
        self.window.value
    }

    pub fn team_capacity(&self) -> Option<f64> {
        self.team_capacity.as_ref().map(|r| r.value)
    }

    pub fn session_ttl_hours(&self) -> u64 {
        self.session_ttl_hours.value
    }

    pub fn issue_url_base(&self) -> Option<&str> {
        self.issue_url_base.as_ref().map(|r| r.value.as_str())
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
    /// Moving-average window from `--window`
    pub window: Option<usize>,
    /// Team capacity from `--capacity`
    pub team_capacity: Option<f64>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_team_capacity(mut self, capacity: f64) -> Self {
        self.team_capacity = Some(capacity);
        self
    }
}

/// Pick the highest-precedence value among CLI, local and system.
fn pick<T: Clone>(cli: Option<&T>, local: Option<&T>, system: Option<&T>) -> Option<Resolved<T>> {
    if let Some(value) = cli {
        Some(Resolved::new(value.clone(), ValueSource::CliFlag))
    } else if let Some(value) = local {
        Some(Resolved::new(value.clone(), ValueSource::Local))
    } else {
        system.map(|value| Resolved::new(value.clone(), ValueSource::System))
    }
}

/// Resolve configuration from already-loaded config levels.
pub fn resolve_from(
    system: &SprintcastConfig,
    local: &SprintcastConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(format) = pick(
        overrides.output_format.as_ref(),
        local.output_format.as_ref(),
        system.output_format.as_ref(),
    ) {
        result.output_format = format;
    }

    // A window of 0 from the command line still means "at least one sprint".
    let cli_window = overrides.window.map(|w| w.max(1));
    if let Some(window) = pick(cli_window.as_ref(), local.window.as_ref(), system.window.as_ref()) {
        result.window = window;
    }

    // Non-positive capacity hints fall through to estimation.
    let cli_capacity = overrides.team_capacity.filter(|c| *c > 0.0);
    result.team_capacity = pick(
        cli_capacity.as_ref(),
        local.team_capacity.as_ref(),
        system.team_capacity.as_ref(),
    );

    if let Some(ttl) = pick(
        None,
        local.session_ttl_hours.as_ref(),
        system.session_ttl_hours.as_ref(),
    ) {
        result.session_ttl_hours = ttl;
    }

    result.issue_url_base = pick(
        None,
        local.issue_url_base.as_ref(),
        system.issue_url_base.as_ref(),
    );

    result
}

/// Resolve configuration with full precedence chain.
///
/// Precedence (highest to lowest):
/// 1. CLI flags (from `overrides`)
/// 2. Data-dir config.kdl
/// 3. System config.kdl
/// 4. Built-in defaults
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_config()?;
    let local_config = storage.read_config()?;
    Ok(resolve_from(&system_config, &local_config, overrides))
}
