use serde::Deserialize;
use std::time::Duration;

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

/// Backoff policy applied by the pipeline after a failed fetch or commit.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay after the first consecutive failure.
    #[serde(rename = "initial_backoff_ms", deserialize_with = "deserialize_duration_from_ms")]
    pub initial_backoff: Duration,
    /// Upper bound for the delay.
    #[serde(rename = "max_backoff_secs", deserialize_with = "deserialize_duration_from_seconds")]
    pub max_backoff: Duration,
    /// Stop the pipeline after this many consecutive failures. Zero retries
    /// forever.
    pub max_consecutive_failures: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            max_consecutive_failures: 0,
        }
    }
}

impl RetryConfig {
    /// Delay before the next attempt, after `failures` consecutive failures.
    /// Doubles per failure, capped at `max_backoff`.
    pub fn backoff(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failures - 1);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Whether `failures` consecutive failures exhaust the policy.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures != 0 && failures >= self.max_consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Config;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let retry = RetryConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            max_consecutive_failures: 0,
        };

        assert_eq!(retry.backoff(0), Duration::ZERO);
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(4), Duration::from_millis(800));
        assert_eq!(retry.backoff(5), Duration::from_secs(1));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_exhaustion() {
        let unlimited = RetryConfig::default();
        assert!(!unlimited.is_exhausted(1_000_000));

        let bounded = RetryConfig { max_consecutive_failures: 3, ..Default::default() };
        assert!(!bounded.is_exhausted(2));
        assert!(bounded.is_exhausted(3));
    }

    #[test]
    fn test_retry_config_from_yaml() {
        let yaml = "
            initial_backoff_ms: 50
            max_backoff_secs: 5
            max_consecutive_failures: 10
        ";
        let config: RetryConfig = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.max_backoff, Duration::from_secs(5));
        assert_eq!(config.max_consecutive_failures, 10);
    }
}
