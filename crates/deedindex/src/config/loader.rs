use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Reads a JSON config file. Missing keys take their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = load_config_from_str(&content)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let fail = |message: String| Err(ConfigError::Validation { message });

    if config.database_path.as_os_str().is_empty() {
        return fail("database_path must not be empty".to_string());
    }
    if config.upload_directory.as_os_str().is_empty() {
        return fail("upload_directory must not be empty".to_string());
    }
    if config.max_per_page == 0 {
        return fail("max_per_page must be at least 1".to_string());
    }
    if config.default_per_page == 0 || config.default_per_page > config.max_per_page {
        return fail(format!(
            "default_per_page must be between 1 and max_per_page ({}), got {}",
            config.max_per_page, config.default_per_page
        ));
    }
    if config.retention_days == 0 {
        return fail("retention_days must be at least 1".to_string());
    }
    if config.cleanup_interval_secs == 0 {
        return fail("cleanup_interval_secs must be at least 1".to_string());
    }

    Ok(())
}
