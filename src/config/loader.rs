use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Largest accepted `stats.top_count`.
pub const MAX_TOP_COUNT: usize = 20;
/// Number of time units `duration_to_words` knows.
pub const MAX_GRADUATIONS: usize = 5;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/todo-lab/config.toml` on Unix/macOS, or the
    /// platform equivalent via `dirs::config_dir()`. Falls back to the
    /// current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("todo-lab").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `stats.top_count` is between 1 and `MAX_TOP_COUNT`
    /// - `stats.duration_graduations` is between 1 and `MAX_GRADUATIONS`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TOP_COUNT).contains(&self.stats.top_count) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "stats.top_count must be between 1 and {}, got {}",
                    MAX_TOP_COUNT, self.stats.top_count
                ),
            });
        }

        if !(1..=MAX_GRADUATIONS).contains(&self.stats.duration_graduations) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "stats.duration_graduations must be between 1 and {}, got {}",
                    MAX_GRADUATIONS, self.stats.duration_graduations
                ),
            });
        }

        Ok(())
    }
}
