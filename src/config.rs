//! Configuration module for the pattern library.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PK_` and use double underscores
//! to separate nested levels:
//! - `PK_PATTERNS__DIR=/srv/patterns` sets `patterns.dir`
//! - `PK_HOT_RELOAD__ENABLED=true` sets `hot_reload.enabled`
//! - `PK_HOT_RELOAD__DEBOUNCE_MS=250` sets `hot_reload.debounce_ms`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name that marks a workspace, searched from the current directory upwards.
pub const CONFIG_DIR: &str = ".patternkit";

/// Lower bound for the debounce window.
pub const MIN_DEBOUNCE_MS: u64 = 100;
/// Upper bound for the debounce window.
pub const MAX_DEBOUNCE_MS: u64 = 5000;
/// Debounce window used when none is configured.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Where patterns live on disk
    #[serde(default)]
    pub patterns: PatternsConfig,

    /// Hot-reload behavior
    #[serde(default)]
    pub hot_reload: HotReloadConfig,

    /// Log filtering
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PatternsConfig {
    /// Root patterns directory. Without one, patterns can only be added in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Subdirectories of `dir` that are searched and watched alongside the root.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct HotReloadConfig {
    /// Watch the patterns directory and apply edits without restart
    #[serde(default = "default_false")]
    pub enabled: bool,

    /// Quiet period a file must observe before it is reloaded
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `patternkit::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_false() -> bool {
    false
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_search_paths() -> Vec<String> {
    [
        "analytics",
        "ml",
        "timeseries",
        "text",
        "data_quality",
        "rest_api",
        "document",
        "etl",
        "prompt_engineering",
        "code",
        "debugging",
        "vision",
        "evaluation",
        // Nested vendor directories
        "teradata/analytics",
        "teradata/ml",
        "teradata/timeseries",
        "teradata/data_quality",
        "teradata/data_loading",
        "teradata/data_modeling",
        "teradata/code_migration",
        "teradata/data_discovery",
        "teradata/text",
        "teradata/performance",
        "postgres/analytics",
        "sql/timeseries",
        "sql/data_quality",
        "sql/text",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            patterns: PatternsConfig::default(),
            hot_reload: HotReloadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            search_paths: default_search_paths(),
        }
    }
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl HotReloadConfig {
    /// Enabled config with the given debounce window.
    pub fn enabled(debounce_ms: u64) -> Self {
        Self {
            enabled: true,
            debounce_ms,
        }
    }

    /// Effective debounce window.
    ///
    /// Zero selects the default; anything else is clamped to
    /// [`MIN_DEBOUNCE_MS`, `MAX_DEBOUNCE_MS`].
    pub fn debounce(&self) -> Duration {
        let ms = if self.debounce_ms == 0 {
            DEFAULT_DEBOUNCE_MS
        } else {
            self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS)
        };
        Duration::from_millis(ms)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // Relative pattern dirs are resolved against the workspace root
                if let Some(dir) = settings.patterns.dir.as_mut() {
                    if dir.is_relative() {
                        if let Some(root) = Self::workspace_root() {
                            *dir = root.join(&*dir);
                        }
                    }
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore stays
            .merge(Env::prefixed("PK_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the workspace config by looking for the config directory
    /// from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where the config directory is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
