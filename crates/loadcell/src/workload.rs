//! The unit-of-work boundary
//!
//! Embeddings implement [`Workload`] once; the runner invokes it repeatedly
//! and concurrently from every worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;

/// Error returned by a unit of work
///
/// `Throttled` is an explicit back-pressure signal: the worker cools down
/// for the given duration without recording latency or growing its backoff
/// schedule. Every other variant takes the backoff path unless the runner's
/// throttle classifier maps it to a cool-down.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    /// The dependency asked for a fixed cool-down
    #[error("throttled, cool down for {}ms", .0.as_millis())]
    Throttled(Duration),

    /// A transient operational failure worth retrying
    #[error("transient failure: {0}")]
    Transient(String),

    /// Any other failure, wrapped unchanged
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkloadError {
    /// Throttle signal with the given cool-down
    pub fn throttled(retry_after: Duration) -> Self {
        Self::Throttled(retry_after)
    }

    /// Transient failure with the given message
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Short tag for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Throttled(_) => "throttled",
            Self::Transient(_) => "transient",
            Self::Other(_) => "other",
        }
    }

    /// Cool-down demanded by the error itself, if any
    pub fn throttle_delay(&self) -> Option<Duration> {
        match self {
            Self::Throttled(retry_after) => Some(*retry_after),
            _ => None,
        }
    }
}

/// Outcome of one invocation: the number of logical operations completed
pub type WorkResult = Result<u64, WorkloadError>;

/// Maps an error to an optional fixed cool-down
///
/// Consulted on the failure path after the error's own
/// [`throttle_delay`](WorkloadError::throttle_delay). Returning `Some`
/// suspends the worker for exactly that long instead of backing off.
/// Classifiers must be pure; they run on every failure.
pub type ThrottleClassifier = Arc<dyn Fn(&WorkloadError) -> Option<Duration> + Send + Sync>;

/// One batch of application-defined operations
///
/// Invoked once per worker loop iteration with the worker's id and its
/// owned random source. A single instance is shared across all workers, so
/// implementations must be safe to call concurrently.
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    /// Perform one batch and return the count of operations completed
    async fn invoke(&self, worker_id: usize, rng: &mut StdRng) -> WorkResult;
}
