use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_DATABASE_PATH: &str = "DEEDINDEX_DATABASE_PATH";
pub const ENV_UPLOAD_DIR: &str = "DEEDINDEX_UPLOAD_DIR";
pub const ENV_RETENTION_DAYS: &str = "DEEDINDEX_RETENTION_DAYS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_upload_directory")]
    pub upload_directory: PathBuf,
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Uploaded files older than this many days are removed by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn base_directory() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".deedindex"))
        .unwrap_or_else(|| PathBuf::from(".deedindex"))
}

fn default_database_path() -> PathBuf {
    base_directory().join("data").join("deedindex.db")
}

fn default_upload_directory() -> PathBuf {
    base_directory().join("uploads")
}

fn default_per_page() -> u32 {
    100
}

fn default_max_per_page() -> u32 {
    1000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_retention_days() -> u32 {
    30
}

fn default_cleanup_interval_secs() -> u64 {
    86_400
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            upload_directory: default_upload_directory(),
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            busy_timeout_ms: default_busy_timeout_ms(),
            retention_days: default_retention_days(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies `DEEDINDEX_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Applies overrides read through `lookup`. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = get(ENV_UPLOAD_DIR) {
            self.upload_directory = PathBuf::from(dir);
        }
        if let Some(days) = get(ENV_RETENTION_DAYS) {
            self.retention_days = days
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_RETENTION_DAYS,
                    value: days.clone(),
                })?;
        }
        Ok(self)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Page size for a request, falling back to the default and capped at
    /// `max_per_page`.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        crate::search::clamp_per_page(
            requested.unwrap_or(self.default_per_page),
            self.max_per_page,
        )
    }
}
