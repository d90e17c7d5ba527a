use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ordering::{FilterSet, SortCriterion};

/// Directory holding the tracker database and its config.
pub const TRACKER_DIR: &str = ".bugtrail";
/// SQLite file inside [`TRACKER_DIR`].
pub const DB_FILE: &str = "bugtrail.db";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound for one store call, in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_len")]
    pub min_title_len: usize,
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
    #[serde(default = "default_min_len")]
    pub min_project_name_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_title_len: default_min_len(),
            max_title_len: default_max_title_len(),
            min_project_name_len: default_min_len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub default_sort: SortCriterion,
    #[serde(default)]
    pub show_closed: bool,
}

impl ViewConfig {
    /// Filters a fresh bug list starts with.
    #[must_use]
    pub fn initial_filters(&self) -> FilterSet {
        if self.show_closed {
            FilterSet::all()
        } else {
            FilterSet::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default acting identity.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub tracker: TrackerConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// `<root>/.bugtrail`.
#[must_use]
pub fn tracker_dir(root: &Path) -> PathBuf {
    root.join(TRACKER_DIR)
}

/// `<root>/.bugtrail/bugtrail.db`.
#[must_use]
pub fn db_path(root: &Path) -> PathBuf {
    tracker_dir(root).join(DB_FILE)
}

/// Load `.bugtrail/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_tracker_config(root: &Path) -> Result<TrackerConfig> {
    let path = tracker_dir(root).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<TrackerConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `config` to `.bugtrail/config.toml`, creating the directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_tracker_config(root: &Path, config: &TrackerConfig) -> Result<PathBuf> {
    let dir = tracker_dir(root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(CONFIG_FILE);
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Load `<config_dir>/bugtrail/config.toml`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("bugtrail").join(CONFIG_FILE);
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge tracker config, user config and the output mode.
///
/// # Errors
///
/// Returns an error if either config file is malformed.
pub fn resolve_config(root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let tracker = load_tracker_config(root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        tracker,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_write_timeout_ms() -> u64 {
    5_000
}

const fn default_min_len() -> usize {
    3
}

const fn default_max_title_len() -> usize {
    200
}
