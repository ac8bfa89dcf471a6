use std::time::Duration;

use serde::Deserialize;

use super::{deserialize_duration_from_seconds, deserialize_url_string};

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_prefilter_receipts() -> bool {
    true
}

/// Which data the portal is asked to return.
///
/// This only shapes the request. The fields the filter needs are always
/// requested and the filter never reads this selection, so it cannot change
/// which receipts become records.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FieldSelection {
    /// Ask the portal to return `LOG_DATA` receipts only.
    pub prefilter_receipts: bool,
    /// Additional receipt fields to request, by portal field name.
    pub extra_receipt_fields: Vec<String>,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self { prefilter_receipts: default_prefilter_receipts(), extra_receipt_fields: Vec::new() }
    }
}

/// Connection settings for the Fuel data portal.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Stream endpoint of the portal dataset.
    #[serde(deserialize_with = "deserialize_url_string")]
    pub url: String,

    /// Timeout for one stream request, including reading the body.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub request_timeout_secs: Duration,

    /// Timeout for establishing connections.
    #[serde(
        default = "default_connect_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub connect_timeout_secs: Duration,

    /// Field selection sent with every request.
    #[serde(default)]
    pub fields: FieldSelection,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            fields: FieldSelection::default(),
        }
    }
}
