//! Per-worker retry tracking with exponential backoff
//!
//! Each worker owns one [`RetryHandler`]. Consecutive failures double the
//! delay up to a ceiling; any success resets the schedule to the start.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff schedule configuration
///
/// Delays start at `initial_delay`, double on every consecutive failure,
/// and never exceed `max_delay`. The schedule is deterministic: a handler
/// that has been reset behaves exactly like a fresh one.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use loadcell::retry::{RetryConfig, RetryHandler};
///
/// let config = RetryConfig::new()
///     .with_initial_delay(Duration::from_millis(100))
///     .with_max_delay(Duration::from_secs(10));
///
/// let mut retry = RetryHandler::new(config);
/// assert_eq!(retry.retry(), Duration::from_millis(100));
/// assert_eq!(retry.retry(), Duration::from_millis(200));
/// assert_eq!(retry.retry(), Duration::from_millis(400));
///
/// retry.reset();
/// assert_eq!(retry.retry(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Delay after the first consecutive failure
    #[serde(with = "duration_millis")]
    pub initial_delay: Duration,

    /// Upper bound for any computed delay
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a config with default delays
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay after the first consecutive failure
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the upper bound for computed delays
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay for the given consecutive-failure count (1-based)
    ///
    /// Returns zero for a count of zero so callers can use the failure
    /// count directly.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        // Exponent capped so the cast below stays in range; anything past
        // 63 doublings saturates at max_delay anyway.
        let exponent = (failures - 1).min(63) as i32;
        let delay = self.initial_delay.as_secs_f64() * 2f64.powi(exponent);
        // Ceilings near Duration::MAX overflow the f64 round-trip; saturate
        // at the configured ceiling instead of panicking.
        Duration::try_from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
            .unwrap_or(self.max_delay)
    }
}

/// Tracks consecutive failures for one worker and hands out backoff delays
///
/// Owned exclusively by a single worker loop, so it needs no
/// synchronization. Call [`reset`](Self::reset) on success and
/// [`retry`](Self::retry) on failure.
#[derive(Debug, Clone)]
pub struct RetryHandler {
    config: RetryConfig,
    failures: u32,
}

impl RetryHandler {
    /// Create a handler with no recorded failures
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Clear the consecutive-failure count
    ///
    /// Idempotent; the next [`retry`](Self::retry) starts the schedule
    /// over from `initial_delay`.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Record another consecutive failure and return the delay to wait
    pub fn retry(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.config.delay_for(self.failures)
    }

    /// Current consecutive-failure count
    pub fn failures(&self) -> u32 {
        self.failures
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
