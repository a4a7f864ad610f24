//! Configuration for Sprintcast.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/sprintcast/config.kdl` (or `$SC_CONFIG_DIR/config.kdl`)
//! - Local: `<data>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `window` - Moving-average window for forecasts
//! - `team-capacity` - Team capacity in hours per sprint
//! - `session-ttl-hours` - Age after which loaded sessions are pruned
//! - `issue-url-base` - Tracker URL used to link blockers
//!
//! ## Precedence
//!
//! CLI flag > local config > system config > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DEFAULT_SESSION_TTL_HOURS, Resolved, ResolvedConfig, ValueSource,
    resolve_config, resolve_from,
};
pub use schema::{CONFIG_KEYS, OutputFormat, SprintcastConfig, parse_config};
