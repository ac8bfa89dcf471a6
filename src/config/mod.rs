//! Configuration module for the indexer.

mod app_config;
mod helpers;
mod http_retry;
mod portal;
mod retry;

pub use app_config::AppConfig;
pub use helpers::{
    deserialize_duration_from_ms, deserialize_duration_from_seconds, deserialize_log_types,
    deserialize_url_string, serialize_duration_to_ms, serialize_duration_to_seconds,
};
pub use http_retry::{HttpRetryConfig, JitterSetting};
pub use portal::{FieldSelection, PortalConfig};
pub use retry::RetryConfig;
