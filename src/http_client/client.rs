//! This module provides functionality to create a retryable HTTP client with
//! middleware for handling transient errors, such as network issues or rate
//! limiting.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{HttpRetryConfig, JitterSetting, PortalConfig};

/// Builds the plain `reqwest` client used to talk to the portal, with the
/// portal's connect and request timeouts applied.
pub fn create_base_http_client(portal: &PortalConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(portal.connect_timeout_secs)
        .timeout(portal.request_timeout_secs)
        .build()
}

/// Creates a retryable HTTP client on top of `base_client`.
///
/// # Parameters:
/// - `config`: Configuration for retry policies
/// - `base_client`: The base HTTP client to use
///
/// # Returns
/// A `ClientWithMiddleware` that includes retry capabilities
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
) -> ClientWithMiddleware {
    let policy_builder = match config.jitter {
        JitterSetting::None => ExponentialBackoff::builder().jitter(Jitter::None),
        JitterSetting::Full => ExponentialBackoff::builder().jitter(Jitter::Full),
    };

    let retry_policy = policy_builder
        .base(config.base_for_backoff)
        .retry_bounds(config.initial_backoff_ms, config.max_backoff_secs)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_retryable_client_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server.mock("GET", "/").with_status(503).expect(3).create_async().await;

        let retry = HttpRetryConfig {
            max_retries: 2,
            initial_backoff_ms: Duration::from_millis(1),
            max_backoff_secs: Duration::from_millis(5),
            jitter: JitterSetting::None,
            ..Default::default()
        };
        let client = create_retryable_http_client(&retry, reqwest::Client::new());

        let response = client.get(server.url()).send().await.unwrap();

        assert_eq!(response.status(), 503);
        failing.assert_async().await;
    }

    #[test]
    fn test_base_client_builds_from_portal_config() {
        let portal = PortalConfig {
            url: "http://localhost:8080/stream".to_string(),
            request_timeout_secs: Duration::from_secs(1),
            connect_timeout_secs: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(create_base_http_client(&portal).is_ok());
    }
}
