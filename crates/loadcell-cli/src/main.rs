// Loadcell CLI
//
// Decision: Workloads run against an in-memory store; the harness only sees
// the unit-of-work boundary, the same seam a real embedding would wire.
// Decision: Shutdown is a single watch channel fed by Ctrl-C or an optional
// deadline, mirroring a service host's cancellation path.

mod workloads;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loadcell::prelude::*;
use workloads::{
    new_store, populate, FlakyWorkload, ReadWorkload, WriteWorkload, RATE_LIMIT_MESSAGE,
};

#[derive(Parser)]
#[command(name = "loadcell")]
#[command(about = "Drive synthetic workloads and report throughput")]
#[command(version)]
struct Cli {
    /// Workload to run
    #[arg(long, short, default_value = "read", value_parser = ["read", "write", "flaky"])]
    workload: String,

    /// Number of concurrent workers
    #[arg(long, env = "LOADCELL_WORKERS", default_value = "8")]
    workers: usize,

    /// Keys in the in-memory store
    #[arg(long, default_value = "100000")]
    keys: u64,

    /// Value size in bytes
    #[arg(long, default_value = "1024")]
    value_size: usize,

    /// Operations per write batch
    #[arg(long, default_value = "8")]
    batch_size: u64,

    /// Metrics sampling interval in milliseconds
    #[arg(long, default_value = "1000")]
    sample_interval_ms: u64,

    /// Backoff after the first consecutive failure, in milliseconds
    #[arg(long, default_value = "100")]
    initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[arg(long, default_value = "10000")]
    max_backoff_ms: u64,

    /// Simulated per-operation latency for the flaky workload, in milliseconds
    #[arg(long, default_value = "10")]
    op_latency_ms: u64,

    /// Probability of an injected transient fault (flaky workload only)
    #[arg(long, default_value = "0.0")]
    fail_rate: f64,

    /// Probability of an injected rate-limit error (flaky workload only)
    #[arg(long, default_value = "0.0")]
    throttle_rate: f64,

    /// Cool-down applied to classified rate-limit errors, in milliseconds
    #[arg(long, default_value = "1000")]
    cool_down_ms: u64,

    /// Stop after this many seconds (runs until Ctrl-C if omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Output format for the end-of-run summary
    #[arg(long, short, default_value = "text", value_parser = ["text", "json"])]
    output: String,
}

/// End-of-run summary
#[derive(Serialize)]
struct Summary {
    workload: String,
    workers: usize,
    total_operations: u64,
    reports: Vec<StatsReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadcell=info,loadcell_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = RunnerConfig::new(cli.workload.clone())
        .with_sample_interval(Duration::from_millis(cli.sample_interval_ms))
        .with_retry(
            RetryConfig::new()
                .with_initial_delay(Duration::from_millis(cli.initial_backoff_ms))
                .with_max_delay(Duration::from_millis(cli.max_backoff_ms)),
        );

    // Rate-limit errors from the flaky workload arrive as opaque transient
    // failures; the classifier turns them into fixed cool-downs.
    let cool_down = Duration::from_millis(cli.cool_down_ms);
    let runner = WorkloadRunner::new(config)?.with_throttle_classifier(move |err| match err {
        WorkloadError::Transient(msg) if msg.contains(RATE_LIMIT_MESSAGE) => Some(cool_down),
        _ => None,
    });
    let stats = runner.stats();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_shutdown_trigger(shutdown_tx, cli.duration_secs.map(Duration::from_secs));

    let keys = cli.keys.max(1);
    match cli.workload.as_str() {
        "read" => {
            let store = new_store();
            info!(keys, value_size = cli.value_size, "Populating store");
            populate(store.clone(), keys, cli.value_size).await;
            let workload = ReadWorkload::new(store, keys);
            runner.run(cli.workers, workload, shutdown_rx).await?;
        }
        "write" => {
            let store = new_store();
            let workload = WriteWorkload::new(store, keys, cli.value_size, cli.batch_size.max(1));
            runner.run(cli.workers, workload, shutdown_rx).await?;
        }
        _ => {
            let workload = FlakyWorkload::new(
                Duration::from_millis(cli.op_latency_ms),
                cli.fail_rate.clamp(0.0, 1.0),
                cli.throttle_rate.clamp(0.0, 1.0),
            );
            runner.run(cli.workers, workload, shutdown_rx).await?;
        }
    }

    let summary = Summary {
        workload: cli.workload,
        workers: cli.workers,
        total_operations: stats.lifetime_operations(),
        reports: stats.recent_reports(),
    };
    match cli.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => info!(
            workload = %summary.workload,
            workers = summary.workers,
            total_operations = summary.total_operations,
            reports = summary.reports.len(),
            "Workload complete"
        ),
    }

    Ok(())
}

/// Broadcast shutdown on Ctrl-C or when the deadline elapses
fn spawn_shutdown_trigger(shutdown_tx: watch::Sender<bool>, deadline: Option<Duration>) {
    tokio::spawn(async move {
        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
                    _ = tokio::time::sleep(deadline) => info!("Deadline reached"),
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Received shutdown signal");
            }
        }
        let _ = shutdown_tx.send(true);
    });
}
