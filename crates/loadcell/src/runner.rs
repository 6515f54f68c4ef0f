//! Workload runner: fixed worker pool plus one sampling loop
//!
//! [`WorkloadRunner::run`] spawns `worker_count` long-lived workers that
//! each drive the unit of work in a loop, and one detached sampling task
//! that drains the shared counters every interval. Everything observes the
//! same shutdown signal and stops cooperatively.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::config::RunnerConfig;
use crate::retry::RetryHandler;
use crate::stats::WorkloadStats;
use crate::workload::{ThrottleClassifier, Workload, WorkloadError};

/// Errors surfaced by the workload runner
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RunnerError {
    /// Configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Drives a unit of work across a pool of concurrent workers
///
/// # Example
///
/// ```ignore
/// use loadcell::prelude::*;
///
/// let runner = WorkloadRunner::new(RunnerConfig::new("reads"))?;
/// let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
///
/// // Resolves once shutdown_tx.send(true) has stopped every worker.
/// runner.run(256, MyWorkload::new(), shutdown_rx).await?;
/// ```
pub struct WorkloadRunner {
    config: RunnerConfig,
    throttle: Option<ThrottleClassifier>,
    stats: Arc<WorkloadStats>,
}

impl fmt::Debug for WorkloadRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadRunner")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl WorkloadRunner {
    /// Create a runner, rejecting unusable configuration
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        if config.name.trim().is_empty() {
            return Err(RunnerError::config("workload name must not be empty"));
        }
        if config.sample_interval < Duration::from_millis(1) {
            return Err(RunnerError::config(
                "sample interval must be at least one millisecond",
            ));
        }
        if config.retry.initial_delay.is_zero() {
            return Err(RunnerError::config(
                "initial retry delay must be greater than zero",
            ));
        }
        if config.retry.max_delay < config.retry.initial_delay {
            return Err(RunnerError::config(
                "max retry delay must not be below the initial delay",
            ));
        }

        Ok(Self {
            config,
            throttle: None,
            stats: Arc::new(WorkloadStats::new()),
        })
    }

    /// Install a throttle classifier
    ///
    /// Consulted on failures whose error carries no cool-down of its own.
    /// A returned duration suspends the worker for exactly that long
    /// without recording latency or growing its backoff schedule.
    pub fn with_throttle_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&WorkloadError) -> Option<Duration> + Send + Sync + 'static,
    {
        self.throttle = Some(Arc::new(classifier));
        self
    }

    /// Shared counters and report history for this runner
    pub fn stats(&self) -> Arc<WorkloadStats> {
        Arc::clone(&self.stats)
    }

    /// Runner configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `worker_count` worker loops until the shutdown signal fires
    ///
    /// Resolves once every worker loop has exited. A worker that panics
    /// terminates alone; the rest of the pool keeps running. The sampling
    /// task is detached and observes the same shutdown signal.
    #[instrument(skip(self, workload, shutdown), fields(workload = %self.config.name))]
    pub async fn run<W: Workload>(
        &self,
        worker_count: usize,
        workload: W,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), RunnerError> {
        info!(
            workload = %self.config.name,
            workers = worker_count,
            sample_interval_ms = self.config.sample_interval.as_millis() as u64,
            "Starting workload runner"
        );

        let workload = Arc::new(workload);
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(
                Worker {
                    id: worker_id,
                    name: self.config.name.clone(),
                    workload: Arc::clone(&workload),
                    stats: Arc::clone(&self.stats),
                    retry: RetryHandler::new(self.config.retry.clone()),
                    throttle: self.throttle.clone(),
                    rng: StdRng::from_entropy(),
                    shutdown: shutdown.clone(),
                }
                .run(),
            );
        }

        tokio::spawn(stats_loop(
            self.config.name.clone(),
            self.config.sample_interval,
            Arc::clone(&self.stats),
            shutdown,
        ));

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(
                    workload = %self.config.name,
                    error = %err,
                    "Worker terminated abnormally"
                );
            }
        }

        info!(workload = %self.config.name, "Workload runner stopped");
        Ok(())
    }
}

/// One long-lived worker loop
struct Worker<W> {
    id: usize,
    name: String,
    workload: Arc<W>,
    stats: Arc<WorkloadStats>,
    retry: RetryHandler,
    throttle: Option<ThrottleClassifier>,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
}

impl<W: Workload> Worker<W> {
    async fn run(mut self) {
        debug!(worker_id = self.id, workload = %self.name, "Worker started");

        while !*self.shutdown.borrow() {
            let started = Instant::now();
            match self.workload.invoke(self.id, &mut self.rng).await {
                Ok(operations) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    self.retry.reset();
                    self.stats.record_success(operations, elapsed_ms);
                }
                Err(err) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;

                    // Failures during shutdown are discarded, not retried.
                    if *self.shutdown.borrow() {
                        break;
                    }

                    match self.cool_down_for(&err) {
                        Some(cool_down) => {
                            // Throttled: no latency recorded, backoff untouched.
                            debug!(
                                worker_id = self.id,
                                workload = %self.name,
                                cool_down_ms = cool_down.as_millis() as u64,
                                "Throttled, cooling down"
                            );
                            if self.wait(cool_down).await {
                                break;
                            }
                        }
                        None => {
                            let retry_in = self.retry.retry();
                            self.stats.record_failure(elapsed_ms);
                            error!(
                                error = %err,
                                kind = err.kind(),
                                workload = %self.name,
                                retry_in_ms = retry_in.as_millis() as u64,
                                "Workload failed, backing off"
                            );
                            if self.wait(retry_in).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        debug!(worker_id = self.id, workload = %self.name, "Worker loop exited");
    }

    /// Cool-down for this error: the error's own signal first, then the classifier
    fn cool_down_for(&self, err: &WorkloadError) -> Option<Duration> {
        err.throttle_delay()
            .or_else(|| self.throttle.as_ref().and_then(|classify| classify(err)))
    }

    /// Sleep for `delay`, returning true if shutdown fired first
    async fn wait(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown.changed() => true,
        }
    }
}

/// Periodic sampling loop
///
/// Drains the shared counters every `interval` and reports via tracing.
/// Windows with no completed operations are skipped but the loop keeps
/// ticking. Runs detached from the worker pool and exits on shutdown.
async fn stats_loop(
    name: String,
    interval: Duration,
    stats: Arc<WorkloadStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(
        workload = %name,
        interval_ms = interval.as_millis() as u64,
        "Sampling loop started"
    );
    let interval_ms = interval.as_millis() as u64;

    while !*shutdown.borrow() {
        let started = Instant::now();
        let cancelled = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            _ = shutdown.changed() => true,
        };
        if cancelled {
            break;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(report) = stats.sample(&name, elapsed_ms, interval_ms) {
            info!(
                workload = %report.workload,
                operations = report.operations,
                throughput = report.throughput,
                latency_ms = report.latency_per_op_ms,
                elapsed_ms = report.elapsed_ms,
                "Throughput statistics"
            );
        }
    }

    debug!(workload = %name, "Sampling loop exited");
}
