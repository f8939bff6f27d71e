//! Application configuration.

use crate::error::{ClipforgeError, ClipforgeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Project-relative media subfolder that relative clip sources resolve against.
    pub media_dir: String,

    /// Subfolder of the media directory that render outputs are written to.
    pub export_dir: String,

    /// Progress polling interval during a render pass, in milliseconds.
    pub progress_interval_ms: u64,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            media_dir: "data".to_string(),
            export_dir: "export".to_string(),
            progress_interval_ms: 100,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = ?config_path, error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Load config from `path`. A missing file yields the defaults; an
    /// unreadable or malformed one is a [`ClipforgeError::Config`].
    pub fn load_from(path: &Path) -> ClipforgeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClipforgeError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ClipforgeError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Where [`AppConfig::load`] looks for the config file.
    pub fn path() -> PathBuf {
        config_file_path()
    }

    /// Progress polling interval as a duration (never zero).
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipforge").join("config.json")
}
