use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the chorus data directory inside a project root.
pub const CHORUS_DIR: &str = ".chorus";

/// Store database filename inside the chorus directory.
pub const STORE_FILE: &str = "chorus.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub notes: NotesConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            notes: NotesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page size used when the caller does not pass a limit.
    #[serde(default = "default_feed_limit")]
    pub default_limit: u32,
    /// Hard ceiling on requested page sizes.
    #[serde(default = "default_feed_max_limit")]
    pub max_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_feed_max_limit(),
        }
    }
}

impl FeedConfig {
    /// Clamp a requested limit into the configured bounds.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Maximum characters in a note or comment body.
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_body_chars: default_max_body_chars(),
        }
    }
}

const fn default_feed_limit() -> u32 {
    20
}

const fn default_feed_max_limit() -> u32 {
    50
}

const fn default_max_body_chars() -> usize {
    8_192
}

/// Per-user preferences, outside any project.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// Preferred output mode for the CLI (`"human"` or `"json"`).
    #[serde(default)]
    pub output: Option<String>,
}

/// Load the user-level config from the platform config directory
/// (`chorus/config.toml`), falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(base) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    let path = base.join("chorus").join("config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read user config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse user config {}", path.display()))
}

/// Load `.chorus/config.toml` from a project root, falling back to defaults
/// when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(CHORUS_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}
