//! # Loadcell
//!
//! A concurrent workload harness: drive a caller-supplied unit of work
//! across a fixed pool of workers, aggregate throughput and latency on a
//! fixed sampling interval, and retry failures with exponential backoff or
//! throttle-aware cool-downs.
//!
//! ## Features
//!
//! - **Fixed worker pool**: long-lived workers each drive the unit of work in a loop
//! - **Self-draining metrics**: shared atomic counters drained into per-interval reports
//! - **Exponential backoff**: per-worker schedules that reset on recovery
//! - **Throttle cool-downs**: dependency back-pressure bypasses the backoff schedule
//! - **Cooperative cancellation**: one watch signal stops workers and sampling promptly
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WorkloadRunner                        │
//! │   (spawns the pool and the sampling loop, joins workers)    │
//! └─────────────────────────────────────────────────────────────┘
//!           │                                     │
//!           ▼                                     ▼
//! ┌───────────────────────────┐      ┌──────────────────────────┐
//! │  Worker loop × N          │      │  Sampling loop × 1       │
//! │  (Workload::invoke,       │─────▶│  (drain WorkloadStats,   │
//! │   RetryHandler backoff)   │      │   report every interval) │
//! └───────────────────────────┘      └──────────────────────────┘
//! ```
//!
//! Workers add completed operations and wall time to [`WorkloadStats`]; the
//! sampling loop drains exactly what it reports, so per-interval numbers
//! never double-count.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use rand::{rngs::StdRng, Rng};
//!
//! use loadcell::prelude::*;
//!
//! struct PingWorkload;
//!
//! #[async_trait]
//! impl Workload for PingWorkload {
//!     async fn invoke(&self, _worker_id: usize, rng: &mut StdRng) -> WorkResult {
//!         // One round trip against the dependency under test.
//!         ping(rng.gen()).await.map_err(WorkloadError::from)?;
//!         Ok(1)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     let config = RunnerConfig::new("ping").with_sample_interval(Duration::from_secs(1));
//!     let runner = WorkloadRunner::new(config)?;
//!     runner.run(64, PingWorkload, shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod retry;
pub mod runner;
pub mod stats;
pub mod workload;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::RunnerConfig;
    pub use crate::retry::{RetryConfig, RetryHandler};
    pub use crate::runner::{RunnerError, WorkloadRunner};
    pub use crate::stats::{StatsReport, WorkloadStats};
    pub use crate::workload::{ThrottleClassifier, WorkResult, Workload, WorkloadError};
}

// Re-export key types at the crate root
pub use config::RunnerConfig;
pub use retry::{RetryConfig, RetryHandler};
pub use runner::{RunnerError, WorkloadRunner};
pub use stats::{StatsReport, WorkloadStats};
pub use workload::{ThrottleClassifier, WorkResult, Workload, WorkloadError};
