//! Configuration system
//!
//! Handles loading configuration from multiple sources:
//! - Global config (~/.config/okr-cascade/config.toml)
//! - Project config (./okr-cascade.toml or .okr-cascade/config.toml)
//! - Environment variables (OKR_CASCADE_*)

use crate::okr::progress::ProgressThresholds;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Snapshot file rendered by the report commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// User id used for "my" views when the snapshot has no current user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,

    /// Objective list rendering
    #[serde(default)]
    pub view: ViewConfig,

    /// Progress band thresholds
    #[serde(default)]
    pub progress: ProgressThresholds,

    /// Ritual dashboard settings
    #[serde(default)]
    pub rituals: RitualConfig,
}

/// How the objective list is laid out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Full,
    Compact,
    Hierarchy,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewMode::Full => "full",
            ViewMode::Compact => "compact",
            ViewMode::Hierarchy => "hierarchy",
        };
        f.pad(name)
    }
}

impl FromStr for ViewMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ViewMode::Full),
            "compact" => Ok(ViewMode::Compact),
            "hierarchy" => Ok(ViewMode::Hierarchy),
            _ => anyhow::bail!("Unknown view mode: {s}. Use: full, compact, hierarchy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    #[serde(default)]
    pub mode: ViewMode,

    /// Columns of indentation per cascade level
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            indent_width: default_indent_width(),
        }
    }
}

fn default_indent_width() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RitualConfig {
    /// How far ahead the "upcoming" list looks
    #[serde(default = "default_upcoming_window_days")]
    pub upcoming_window_days: i64,

    /// Number of completed rituals shown as recent
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for RitualConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: default_upcoming_window_days(),
            recent_limit: default_recent_limit(),
        }
    }
}

fn default_upcoming_window_days() -> i64 {
    14
}

fn default_recent_limit() -> usize {
    4
}

impl Config {
    /// Load configuration from all sources (global, project, env)
    pub async fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            let content = fs::read_to_string(&global_path).await?;
            let global: ConfigLayer = toml::from_str(&content)?;
            config.apply_layer(global);
        }

        // Load project config
        for name in ["okr-cascade.toml", ".okr-cascade/config.toml"] {
            let path = PathBuf::from(name);
            if path.exists() {
                let content = fs::read_to_string(&path).await?;
                let project: ConfigLayer = toml::from_str(&content)?;
                config.apply_layer(project);
            }
        }

        // Apply environment overrides
        config.apply_env();

        Ok(config)
    }

    /// Get the global config directory path
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "okr-cascade", "okr-cascade")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "okr-cascade", "okr-cascade")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Initialize default configuration file
    pub async fn init_default() -> Result<()> {
        if let Some(path) = Self::global_config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let default = Self::default();
            let content = toml::to_string_pretty(&default)?;
            fs::write(&path, content).await?;
            tracing::info!("Created config at {:?}", path);
        }
        Ok(())
    }

    /// Set a configuration value and save it to the global config
    pub async fn set(key: &str, value: &str) -> Result<()> {
        let mut config = Self::load().await?;
        config.apply_key(key, value)?;

        if let Some(path) = Self::global_config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let content = toml::to_string_pretty(&config)?;
            fs::write(&path, content).await?;
        }

        Ok(())
    }

    /// Parse and assign a single `section.key` value
    pub fn apply_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "snapshot_path" => self.snapshot_path = Some(PathBuf::from(value)),
            "current_user" => self.current_user = Some(value.to_string()),
            "view.mode" => self.view.mode = value.parse()?,
            "view.indent_width" => self.view.indent_width = parse_number(key, value)?,
            "progress.on_track" => self.progress.on_track = parse_number(key, value)?,
            "progress.progressing" => self.progress.progressing = parse_number(key, value)?,
            "progress.at_risk" => self.progress.at_risk = parse_number(key, value)?,
            "rituals.upcoming_window_days" => {
                self.rituals.upcoming_window_days = parse_number(key, value)?
            }
            "rituals.recent_limit" => self.rituals.recent_limit = parse_number(key, value)?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Overlay the keys a config file actually sets
    fn apply_layer(&mut self, layer: ConfigLayer) {
        overlay(&mut self.snapshot_path, layer.snapshot_path.map(Some));
        overlay(&mut self.current_user, layer.current_user.map(Some));
        overlay(&mut self.view.mode, layer.view.mode);
        overlay(&mut self.view.indent_width, layer.view.indent_width);
        overlay(&mut self.progress.on_track, layer.progress.on_track);
        overlay(&mut self.progress.progressing, layer.progress.progressing);
        overlay(&mut self.progress.at_risk, layer.progress.at_risk);
        overlay(
            &mut self.rituals.upcoming_window_days,
            layer.rituals.upcoming_window_days,
        );
        overlay(&mut self.rituals.recent_limit, layer.rituals.recent_limit);
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("OKR_CASCADE_SNAPSHOT") {
            self.snapshot_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("OKR_CASCADE_CURRENT_USER") {
            self.current_user = Some(val);
        }
        if let Ok(val) = std::env::var("OKR_CASCADE_VIEW_MODE") {
            match val.parse() {
                Ok(mode) => self.view.mode = mode,
                Err(_) => tracing::warn!(
                    value = %val,
                    "Invalid OKR_CASCADE_VIEW_MODE value; expected full/compact/hierarchy"
                ),
            }
        }
    }
}

/// One config file as written: every key is optional so that a later file
/// only overrides what it mentions
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    snapshot_path: Option<PathBuf>,
    current_user: Option<String>,
    view: ViewLayer,
    progress: ProgressLayer,
    rituals: RitualLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewLayer {
    mode: Option<ViewMode>,
    indent_width: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProgressLayer {
    on_track: Option<i64>,
    progressing: Option<i64>,
    at_risk: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RitualLayer {
    upcoming_window_days: Option<i64>,
    recent_limit: Option<usize>,
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid numeric value for {}: {}", key, value))
}
