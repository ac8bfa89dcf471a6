use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    HttpRetryConfig, PortalConfig, RetryConfig, deserialize_duration_from_ms,
    deserialize_duration_from_seconds, deserialize_log_types,
};
use crate::models::{DEFAULT_LOG_TYPES, LogTypeSet};

/// Provides the default value for shutdown_timeout_secs.
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_polling_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_batch_size() -> u64 {
    100
}

fn default_pipeline_id() -> String {
    "fuel-logs".to_string()
}

fn default_log_types() -> Vec<u64> {
    DEFAULT_LOG_TYPES.to_vec()
}

/// Application configuration for the indexer.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    pub database_url: String,

    /// Key under which the progress marker is stored. Two pipelines with
    /// different ids can share a database.
    #[serde(default = "default_pipeline_id")]
    pub pipeline_id: String,

    /// Height to start from when no progress marker exists yet.
    #[serde(default)]
    pub start_block: u64,

    /// Maximum number of blocks fetched per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// The interval in milliseconds to wait after an empty batch.
    #[serde(
        default = "default_polling_interval",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub polling_interval_ms: Duration,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// Discriminators of the log records to extract.
    #[serde(default = "default_log_types", deserialize_with = "deserialize_log_types")]
    pub log_types: Vec<u64>,

    /// Data portal connection settings.
    pub portal: PortalConfig,

    /// Pipeline backoff after a failed fetch or commit.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Configuration for HTTP client retry policies.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            pipeline_id: default_pipeline_id(),
            start_block: 0,
            batch_size: default_batch_size(),
            polling_interval_ms: default_polling_interval(),
            shutdown_timeout: default_shutdown_timeout(),
            log_types: default_log_types(),
            portal: PortalConfig::default(),
            retry: RetryConfig::default(),
            http_retry_config: HttpRetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    ///
    /// `{config_dir}/app.yaml` is read first; `FUEL_INDEXER__*` environment
    /// variables override it (`FUEL_INDEXER__PORTAL__URL`,
    /// `FUEL_INDEXER__LOG_TYPES=1,2`, ...).
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("FUEL_INDEXER").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// The configured discriminators as an immutable set.
    pub fn log_type_set(&self) -> LogTypeSet {
        LogTypeSet::new(self.log_types.iter().copied())
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn pipeline_id(mut self, pipeline_id: &str) -> Self {
        self.config.pipeline_id = pipeline_id.to_string();
        self
    }

    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = block;
        self
    }

    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn polling_interval(mut self, interval_ms: u64) -> Self {
        self.config.polling_interval_ms = Duration::from_millis(interval_ms);
        self
    }

    pub fn log_types(mut self, log_types: Vec<u64>) -> Self {
        self.config.log_types = log_types;
        self
    }

    pub fn portal_url(mut self, url: &str) -> Self {
        self.config.portal.url = url.to_string();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
