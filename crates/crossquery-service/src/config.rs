//! Configuration management for the crossquery service.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use crossquery_service::config::ServiceConfig;
//!
//! // Load from file with env overrides
//! let config = ServiceConfig::load("crossquery.yaml")?;
//!
//! // Or load from environment only
//! let config = ServiceConfig::from_env()?;
//! ```

use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use crossquery_client::memory::{DEFAULT_MAX_IN_VALUES, DEFAULT_PAGE_SIZE};
use crossquery_client::MemoryQueryClient;
use crossquery_domain::EngineConfig;
use serde::{Deserialize, Serialize};

/// Prefix of environment variable overrides, e.g. `CROSSQUERY_ENGINE__MAX_CONCURRENCY`.
const ENV_PREFIX: &str = "CROSSQUERY";

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceConfig {
    /// Batching, concurrency and reconciliation settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Limits of the in-memory client
    #[serde(default)]
    pub client: ClientSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Per-request limits of the in-memory client.
///
/// These mirror the remote API's own limits so that local runs exercise the
/// same batching and pagination paths.
///
/// ```yaml
/// client:
///   page_size: 500
///   max_in_values: 500
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClientSettings {
    /// Records per page.
    /// Environment variable: `CROSSQUERY_CLIENT__PAGE_SIZE`
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Values accepted in one `in` condition.
    /// Environment variable: `CROSSQUERY_CLIENT__MAX_IN_VALUES`
    #[serde(default = "default_max_in_values")]
    pub max_in_values: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_in_values: default_max_in_values(),
        }
    }
}

impl ClientSettings {
    /// Builds an empty in-memory client with these limits.
    pub fn memory_client(&self) -> MemoryQueryClient {
        MemoryQueryClient::new()
            .with_page_size(self.page_size)
            .with_max_in_values(self.max_in_values)
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_in_values() -> usize {
    DEFAULT_MAX_IN_VALUES
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServiceConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `CROSSQUERY_` and use `__` as separator:
    /// - `CROSSQUERY_ENGINE__MAX_CONCURRENCY=4` overrides `engine.max_concurrency`
    /// - `CROSSQUERY_ENGINE__POSTED_LEDGER_TYPES=1,6` overrides the ledger allow-list
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServiceConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let service_config: ServiceConfig = config.try_deserialize()?;
        service_config.validate()?;

        Ok(service_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServiceConfig::default())?)
            .add_source(environment())
            .build()?;

        let service_config: ServiceConfig = config.try_deserialize()?;
        service_config.validate()?;

        Ok(service_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.engine
            .validate()
            .map_err(|e| ConfigLoadError::Invalid {
                message: format!("engine: {e}"),
            })?;

        if self.client.page_size == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "client.page_size must be greater than 0".to_string(),
            });
        }
        if self.client.max_in_values < self.engine.max_batch_size {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "client.max_in_values ({}) must not be below engine.max_batch_size ({})",
                    self.client.max_in_values, self.engine.max_batch_size
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

// CROSSQUERY_ENGINE__MAX_BATCH_SIZE -> engine.max_batch_size
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("engine.posted_ledger_types")
}
