//! Configuration management for SIDRA ETL
//!
//! `AppConfig` is loaded once at startup and handed to each component.
//! Sources, lowest precedence first: defaults, a TOML file, environment
//! variables (a `.env` file is honoured), and CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::cache::CacheConfig;
use crate::app::client::ClientConfig;
use crate::app::fetcher::FetchConfig;
use crate::app::store::DatabaseConfig;
use crate::constants::{env, logging};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Response cache settings
    pub cache: CacheConfig,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Download settings
    pub fetch: FetchConfig,
    /// Destination database settings
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Also append log output to this file
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// CLI overrides are applied by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match &config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path: path.clone() });
                }
                Some(path.clone())
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            PathBuf::from("./sidra-etl.toml"),
            PathBuf::from("./config.toml"),
        ];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Per-user config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sidra-etl").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Override fields from environment-style variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup(env::DATA_DIR) {
            debug!("{} overrides cache data_dir", env::DATA_DIR);
            self.cache.data_dir = PathBuf::from(data_dir);
        }
        if let Some(password) = lookup(env::DB_PASSWORD) {
            self.database.password = password;
        }
        if let Some(host) = lookup(env::DB_HOST) {
            debug!("{} overrides database host", env::DB_HOST);
            self.database.host = host;
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.data_dir".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
