//! Tracker configuration.
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_RESET_CHECK_SECS, DEFAULT_SAVE_DIR, DEFAULT_STORAGE_KEY, MAX_RESET_CHECK_SECS,
    SAVE_DIR_ENV_VAR,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Name of the single persisted save record.
    pub storage_key: String,
    pub save_dir: PathBuf,
    /// How often an open session re-checks for the daily reset. Values
    /// above one day are treated as one day.
    pub reset_check_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            reset_check_interval_secs: DEFAULT_RESET_CHECK_SECS,
        }
    }
}

impl TrackerConfig {
    /// Parse configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from `path` when given, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&json)?
            }
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(SAVE_DIR_ENV_VAR).filter(|dir| !dir.trim().is_empty()) {
            self.save_dir = PathBuf::from(dir);
        }
        self
    }

    #[must_use]
    pub fn reset_check_interval(&self) -> TimeDelta {
        let secs = self.reset_check_interval_secs.min(MAX_RESET_CHECK_SECS);
        TimeDelta::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}
