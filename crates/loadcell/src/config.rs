//! Runner configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Configuration for a [`WorkloadRunner`](crate::runner::WorkloadRunner)
///
/// The worker count is not part of the configuration; it is passed to
/// [`run`](crate::runner::WorkloadRunner::run) so one runner definition can
/// be driven at different concurrency levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
    /// Workload name carried on every report and failure log
    pub name: String,

    /// Metrics sampling interval
    #[serde(with = "duration_millis")]
    pub sample_interval: Duration,

    /// Backoff schedule handed to every worker
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: "workload".to_string(),
            sample_interval: Duration::from_secs(1),
            retry: RetryConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Create a configuration for the named workload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the workload name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the sampling interval
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the backoff schedule
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.name, "workload");
        assert_eq!(config.sample_interval, Duration::from_secs(1));
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_config_builder() {
        let config = RunnerConfig::new("reads")
            .with_sample_interval(Duration::from_millis(500))
            .with_retry(RetryConfig::new().with_initial_delay(Duration::from_millis(10)));

        assert_eq!(config.name, "reads");
        assert_eq!(config.sample_interval, Duration::from_millis(500));
        assert_eq!(config.retry.initial_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_config_serialization() {
        let config = RunnerConfig::new("writes").with_sample_interval(Duration::from_millis(2000));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"sample_interval\":2000"));

        let parsed: RunnerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_retry_defaults_when_omitted() {
        let json = r#"{"name":"reads","sample_interval":1000}"#;
        let parsed: RunnerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.retry, RetryConfig::default());
    }
}
