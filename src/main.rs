//! # NIC Savings Statistics - Daemon Entry Point
//!
//! Hosts the scheduled metrics-refresh loop: wires the record store, the
//! metric orchestration and the cross-instance refresh lock into the
//! coordinator, starts the fixed-interval trigger, and shuts the loop
//! down cleanly on Ctrl-C. Inbound request handling lives with the
//! external front-end; this process owns only the background side.
//!
//! ## Lifecycle
//!
//! 1. **Initialize logging**: structured tracing with an operator-facing
//!    formatter; `RUST_LOG` overrides the level
//! 2. **Parse arguments**: refresh cadence, staleness threshold, lock
//!    TTL, key material and snapshot output path
//! 3. **Wire components**: store → orchestrator → coordinator → scheduler
//! 4. **Run**: tick at the configured interval until shutdown
//! 5. **Report**: refresh timing statistics and the last published
//!    snapshot on the way out

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nic_savings_stats::{
    cli::{Args, ServiceConfiguration},
    lock::MemoryLock,
    logging::DaemonFormatter,
    metrics::{MetricsOrchestrator, RefreshTimer, SnapshotGauge},
    pseudonym::SystemClock,
    refresh::RefreshCoordinator,
    scheduler::RefreshScheduler,
    store::MemoryStore,
    VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins when set; otherwise --verbose decides the floor.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .event_format(DaemonFormatter)
        .with_env_filter(filter)
        .init();

    let config = ServiceConfiguration::from(&args);
    info!(version = VERSION, "starting savings statistics service");
    info!(
        initial_delay = ?config.refresh_initial_delay,
        interval = ?config.refresh_interval,
        staleness_threshold = ?config.staleness_threshold,
        lock_ttl = ?config.lock_ttl,
        "refresh loop configuration"
    );

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let gauge = Arc::new(SnapshotGauge::new(config.snapshot_output.clone()));
    let timer = Arc::new(RefreshTimer::new()?);

    let orchestrator = Arc::new(MetricsOrchestrator::new(
        store.clone(),
        gauge.clone(),
        clock.clone(),
    ));
    let coordinator = Arc::new(RefreshCoordinator::new(
        store,
        orchestrator,
        Arc::new(MemoryLock::new()),
        timer.clone(),
        clock,
        config.staleness_threshold,
        config.lock_ttl,
    ));

    let scheduler = RefreshScheduler::start(
        coordinator,
        config.refresh_initial_delay,
        config.refresh_interval,
    );
    info!("refresh loop scheduled; Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; stopping refresh loop");
    scheduler.stop().await;

    let stats = timer.statistics();
    info!(
        refreshes = stats.samples,
        mean_ms = stats.mean_ms,
        p95_ms = stats.p95_ms,
        max_ms = stats.max_ms,
        "refresh timing on shutdown"
    );
    if let Some(snapshot) = gauge.latest() {
        info!(
            calculations = snapshot.number_of_calculations,
            unique_sessions = snapshot.number_of_unique_sessions,
            "last published snapshot"
        );
    }

    info!("savings statistics service stopped");
    Ok(())
}
