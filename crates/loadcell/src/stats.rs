//! Shared throughput and latency accounting
//!
//! Workers add to two atomic counters; the sampling loop drains them once
//! per interval into [`StatsReport`] snapshots. Counters hold only what has
//! not been reported yet, so every unit of work is counted exactly once.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Upper bound on retained reports
const RECENT_REPORTS: usize = 64;

/// One sampling-window snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatsReport {
    /// Workload the report belongs to
    pub workload: String,

    /// Operations completed during the window
    pub operations: u64,

    /// Operations per second
    pub throughput: f64,

    /// Mean wall time per operation in milliseconds
    pub latency_per_op_ms: f64,

    /// Measured length of the window in milliseconds
    pub elapsed_ms: u64,
}

/// Aggregate counters shared by every worker of one runner
///
/// `record_*` calls are lock-free. Draining is crate-internal: the runner's
/// sampling loop is the only subtractor, so the counters never go negative.
#[derive(Debug, Default)]
pub struct WorkloadStats {
    /// Operations completed and not yet reported
    operations: AtomicU64,
    /// Wall time accumulated and not yet reported, in milliseconds
    latency_ms: AtomicU64,
    /// Operations completed since creation, never drained
    lifetime_operations: AtomicU64,
    /// Reports produced so far
    reports_emitted: AtomicU64,
    /// Most recent reports, oldest first
    recent: Mutex<VecDeque<StatsReport>>,
}

impl WorkloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful unit of work
    pub fn record_success(&self, operations: u64, elapsed_ms: u64) {
        self.operations.fetch_add(operations, Ordering::Relaxed);
        self.latency_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        self.lifetime_operations.fetch_add(operations, Ordering::Relaxed);
    }

    /// Record the wall time of a failed attempt
    ///
    /// Failed attempts cost latency but complete no operations, which pushes
    /// the reported per-operation latency up during outages.
    pub fn record_failure(&self, elapsed_ms: u64) {
        self.latency_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// Operations recorded and not yet reported
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Latency recorded and not yet reported, in milliseconds
    pub fn latency_ms(&self) -> u64 {
        self.latency_ms.load(Ordering::Relaxed)
    }

    /// Operations recorded since creation
    pub fn lifetime_operations(&self) -> u64 {
        self.lifetime_operations.load(Ordering::Relaxed)
    }

    /// Number of reports produced so far
    pub fn reports_emitted(&self) -> u64 {
        self.reports_emitted.load(Ordering::Relaxed)
    }

    /// Most recent reports, oldest first
    pub fn recent_reports(&self) -> Vec<StatsReport> {
        self.recent.lock().iter().cloned().collect()
    }

    /// Drain one sampling window into a report
    ///
    /// Reads both counters without clearing them, skips the window when no
    /// operations completed, and otherwise subtracts exactly the reported
    /// amounts. Increments landing between the read and the subtract spill
    /// into the next window. The throughput denominator is the larger of
    /// the measured elapsed time and the nominal interval, so a slow cycle
    /// lowers throughput rather than inflating it.
    pub(crate) fn sample(
        &self,
        workload: &str,
        elapsed_ms: u64,
        interval_ms: u64,
    ) -> Option<StatsReport> {
        let operations = self.operations.load(Ordering::Relaxed);
        let latency_ms = self.latency_ms.load(Ordering::Relaxed);
        if operations == 0 {
            return None;
        }

        let denominator_ms = elapsed_ms.max(interval_ms);
        let throughput = (operations as f64 * 1000.0) / denominator_ms as f64;
        let latency_per_op_ms = latency_ms as f64 / operations as f64;

        let report = StatsReport {
            workload: workload.to_string(),
            operations,
            throughput,
            latency_per_op_ms,
            elapsed_ms,
        };

        self.operations.fetch_sub(operations, Ordering::Relaxed);
        self.latency_ms.fetch_sub(latency_ms, Ordering::Relaxed);
        self.reports_emitted.fetch_add(1, Ordering::Relaxed);

        let mut recent = self.recent.lock();
        if recent.len() == RECENT_REPORTS {
            recent.pop_front();
        }
        recent.push_back(report.clone());

        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_drain_round_trip() {
        let stats = WorkloadStats::new();
        stats.record_success(5, 50);
        assert_eq!(stats.operations(), 5);
        assert_eq!(stats.latency_ms(), 50);

        let report = stats.sample("reads", 1000, 1000).unwrap();
        assert_eq!(report.workload, "reads");
        assert_eq!(report.operations, 5);
        assert_eq!(report.throughput, 5.0);
        assert_eq!(report.latency_per_op_ms, 10.0);
        assert_eq!(report.elapsed_ms, 1000);

        // Drained: the next window starts from zero.
        assert_eq!(stats.operations(), 0);
        assert_eq!(stats.latency_ms(), 0);
        assert_eq!(stats.lifetime_operations(), 5);
        assert_eq!(stats.reports_emitted(), 1);
    }

    #[test]
    fn test_sample_skips_empty_window() {
        let stats = WorkloadStats::new();
        assert!(stats.sample("reads", 1000, 1000).is_none());
        assert_eq!(stats.reports_emitted(), 0);
    }

    #[test]
    fn test_drain_balances_under_concurrent_recording() {
        use std::sync::Arc;

        let stats = Arc::new(WorkloadStats::new());
        stats.record_success(10, 100);

        let recorder = {
            let stats = Arc::clone(&stats);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record_success(1, 1);
                }
            })
        };
        let mut reported = 0;
        for _ in 0..50 {
            if let Some(report) = stats.sample("reads", 1000, 1000) {
                reported += report.operations;
            }
        }
        recorder.join().unwrap();

        // Increments racing a drain spill into the next window; every
        // recorded operation is reported exactly once or still pending.
        assert_eq!(reported + stats.operations(), 1010);
        assert_eq!(stats.lifetime_operations(), 1010);
    }

    #[test]
    fn test_failure_latency_carries_into_next_report() {
        let stats = WorkloadStats::new();
        stats.record_failure(100);

        // No completed operations yet, so nothing to report and the
        // accumulated latency stays put.
        assert!(stats.sample("reads", 1000, 1000).is_none());
        assert_eq!(stats.latency_ms(), 100);

        stats.record_success(1, 10);
        let report = stats.sample("reads", 1000, 1000).unwrap();
        assert_eq!(report.operations, 1);
        assert_eq!(report.latency_per_op_ms, 110.0);
    }

    #[test]
    fn test_sample_uses_interval_floor() {
        let stats = WorkloadStats::new();
        stats.record_success(100, 0);

        // Elapsed below the nominal interval: the interval is the floor.
        let report = stats.sample("reads", 250, 1000).unwrap();
        assert_eq!(report.throughput, 100.0);
        assert_eq!(report.elapsed_ms, 250);
    }

    #[test]
    fn test_sample_uses_elapsed_when_slower() {
        let stats = WorkloadStats::new();
        stats.record_success(100, 0);

        let report = stats.sample("reads", 2000, 1000).unwrap();
        assert_eq!(report.throughput, 50.0);
        assert_eq!(report.elapsed_ms, 2000);
    }

    #[test]
    fn test_recent_reports_bounded() {
        let stats = WorkloadStats::new();
        for _ in 0..100 {
            stats.record_success(1, 1);
            stats.sample("reads", 1000, 1000).unwrap();
        }
        assert_eq!(stats.recent_reports().len(), RECENT_REPORTS);
        assert_eq!(stats.reports_emitted(), 100);
        assert_eq!(stats.lifetime_operations(), 100);
    }

    #[test]
    fn test_report_serialization() {
        let stats = WorkloadStats::new();
        stats.record_success(4, 40);
        let report = stats.sample("writes", 1000, 1000).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: StatsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
