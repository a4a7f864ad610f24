//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation of individual keys for `sc config set`

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: [&str; 5] = [
    "output-format",
    "window",
    "team-capacity",
    "session-ttl-hours",
    "issue-url-base",
];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// output-format "human"  // or "json"
/// window 4
/// team-capacity 120.0
/// session-ttl-hours 168
/// issue-url-base "https://example.atlassian.net"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SprintcastConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Moving-average window in sprints (at least 1)
    pub window: Option<usize>,

    /// Team capacity in hours per sprint (positive)
    pub team_capacity: Option<f64>,

    /// Sessions older than this are pruned
    pub session_ttl_hours: Option<u64>,

    /// Tracker base URL used to link blockers
    pub issue_url_base: Option<String>,
}

impl SprintcastConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(window) = self.window {
            if window == 0 {
                return Err("window must be at least 1".to_string());
            }
        }
        if let Some(capacity) = self.team_capacity {
            if !(capacity.is_finite() && capacity > 0.0) {
                return Err(format!("team-capacity must be positive, got {}", capacity));
            }
        }
        if let Some(ref base) = self.issue_url_base {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(format!("issue-url-base must be an http(s) URL, got {}", base));
            }
        }
        Ok(())
    }

    /// Set one key from its textual value, validating it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let mut updated = self.clone();
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value)
                    .ok_or_else(|| format!("output-format must be json or human, got {}", value))?;
                updated.output_format = Some(format);
            }
            "window" => {
                let window = value
                    .parse()
                    .map_err(|_| format!("window must be a whole number, got {}", value))?;
                updated.window = Some(window);
            }
            "team-capacity" => {
                let capacity = value
                    .parse()
                    .map_err(|_| format!("team-capacity must be a number, got {}", value))?;
                updated.team_capacity = Some(capacity);
            }
            "session-ttl-hours" => {
                let ttl = value.parse().map_err(|_| {
                    format!("session-ttl-hours must be a whole number, got {}", value)
                })?;
                updated.session_ttl_hours = Some(ttl);
            }
            "issue-url-base" => {
                updated.issue_url_base = Some(value.trim_end_matches('/').to_string());
            }
            _ => {
                return Err(format!(
                    "Unknown config key: {} (expected one of: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                ));
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(value) = first_value(doc, "output-format") {
            if let Some(s) = value.as_string() {
                config.output_format = OutputFormat::parse(s);
            }
        }

        if let Some(value) = first_value(doc, "window") {
            match value.as_integer() {
                Some(i) if i >= 1 => config.window = Some(i as usize),
                _ => warn!(value = %value, "ignoring invalid window in config"),
            }
        }

        if let Some(value) = first_value(doc, "team-capacity") {
            let capacity = value
                .as_float()
                .or_else(|| value.as_integer().map(|i| i as f64));
            match capacity {
                Some(c) if c.is_finite() && c > 0.0 => config.team_capacity = Some(c),
                _ => warn!(value = %value, "ignoring invalid team-capacity in config"),
            }
        }

        if let Some(value) = first_value(doc, "session-ttl-hours") {
            match value.as_integer() {
                Some(i) if i >= 0 => config.session_ttl_hours = Some(i as u64),
                _ => warn!(value = %value, "ignoring invalid session-ttl-hours in config"),
            }
        }

        if let Some(value) = first_value(doc, "issue-url-base") {
            if let Some(s) = value.as_string() {
                config.issue_url_base = Some(s.to_string());
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_node(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(window) = self.window {
            push_node(&mut doc, "window", KdlValue::Integer(window as i128));
        }
        if let Some(capacity) = self.team_capacity {
            push_node(&mut doc, "team-capacity", KdlValue::Float(capacity));
        }
        if let Some(ttl) = self.session_ttl_hours {
            push_node(&mut doc, "session-ttl-hours", KdlValue::Integer(ttl as i128));
        }
        if let Some(ref base) = self.issue_url_base {
            push_node(&mut doc, "issue-url-base", KdlValue::String(base.clone()));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &SprintcastConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.window.is_some() {
            self.window = other.window;
        }
        if other.team_capacity.is_some() {
            self.team_capacity = other.team_capacity;
        }
        if other.session_ttl_hours.is_some() {
            self.session_ttl_hours = other.session_ttl_hours;
        }
        if other.issue_url_base.is_some() {
            self.issue_url_base = other.issue_url_base.clone();
        }
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

/// Parse config text, logging and ignoring malformed documents.
pub fn parse_config(content: &str) -> SprintcastConfig {
    match content.parse::<KdlDocument>() {
        Ok(doc) => SprintcastConfig::from_kdl(&doc),
        Err(e) => {
            warn!(error = %e, "ignoring malformed config.kdl");
            SprintcastConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_config_kdl_roundtrip() {
        let config = SprintcastConfig {
            output_format: Some(OutputFormat::Human),
            window: Some(6),
            team_capacity: Some(120.5),
            session_ttl_hours: Some(24),
            issue_url_base: Some("https://example.atlassian.net".to_string()),
        };
        let text = config.to_kdl().to_string();
        assert_eq!(parse_config(&text), config);
    }

    #[test]
    fn test_config_from_kdl_text() {
        let config = parse_config("window 3\nteam-capacity 90\noutput-format \"json\"\n");
        assert_eq!(config.window, Some(3));
        assert_eq!(config.team_capacity, Some(90.0));
        assert_eq!(config.output_format, Some(OutputFormat::Json));
        assert_eq!(config.session_ttl_hours, None);
    }

    #[test]
    fn test_config_invalid_values_ignored() {
        let config = parse_config("window 0\nteam-capacity -5\n");
        assert_eq!(config.window, None);
        assert_eq!(config.team_capacity, None);
    }

    #[test]
    fn test_malformed_config_is_empty() {
        assert_eq!(parse_config("window {{{"), SprintcastConfig::default());
    }

    #[test]
    fn test_set_validates() {
        let mut config = SprintcastConfig::new();
        config.set("window", "5").unwrap();
        assert_eq!(config.window, Some(5));
        assert!(config.set("window", "0").is_err());
        assert_eq!(config.window, Some(5));
        assert!(config.set("team-capacity", "abc").is_err());
        assert!(config.set("output-format", "xml").is_err());
        assert!(config.set("colour", "red").is_err());
        config
            .set("issue-url-base", "https://tracker.example.com/")
            .unwrap();
        assert_eq!(
            config.issue_url_base.as_deref(),
            Some("https://tracker.example.com")
        );
        assert!(config.set("issue-url-base", "tracker").is_err());
    }

    #[test]
    fn test_merge() {
        let mut base = SprintcastConfig {
            window: Some(4),
            team_capacity: Some(80.0),
            ..Default::default()
        };
        base.merge(&SprintcastConfig {
            window: Some(6),
            ..Default::default()
        });
        assert_eq!(base.window, Some(6));
        assert_eq!(base.team_capacity, Some(80.0));
    }
}
