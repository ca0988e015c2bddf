//! # NIC Savings Statistics
//!
//! Anonymously records the outcomes of a tax-savings calculation
//! performed by an external front-end and produces aggregate statistics
//! (counts, totals, averages) over those records, optionally filtered by
//! a time window. A scheduled, lock-coordinated background loop keeps a
//! small set of published operational metrics fresh without redundant
//! recomputation.
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `model`: the immutable calculation record, the summary report and
//!   the half-open time-window filter
//! - `store`: the aggregation repository seam and the in-memory
//!   document-store backend with a timestamp-ordered index
//! - `service`: business-level orchestration — pseudonymised saves and
//!   the six-statistic summary fan-out
//! - `pseudonym`: the one-way keyed session hash and the injectable clock
//! - `metrics`: the published metric snapshot, its publisher, and the
//!   HDR-histogram refresh timer
//! - `lock`: fail-fast, TTL-bearing mutual exclusion across instances
//! - `refresh`: the per-tick decision ladder deciding whether a
//!   recomputation is warranted
//! - `scheduler`: the fixed-interval trigger with clean cancellation
//! - `cli`: command-line configuration surface
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nic_savings_stats::{
//!     CalculationRequest, CalculationService, KeyedSessionHasher, MemoryStore, SystemClock,
//!     TimeWindow,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = CalculationService::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(KeyedSessionHasher::new("key material")),
//!         Arc::new(SystemClock),
//!     );
//!
//!     service
//!         .save(
//!             Some("session-id-from-header"),
//!             CalculationRequest {
//!                 annual_salary: "40000".parse()?,
//!                 year1_estimated_nic: "3000".parse()?,
//!                 year2_estimated_nic: "3100".parse()?,
//!                 rounded_saving: "150".parse()?,
//!                 saving: None,
//!             },
//!         )
//!         .await?;
//!
//!     let report = service.summary(TimeWindow::unbounded()).await?;
//!     println!("calculations recorded: {}", report.number_of_calculations);
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! The store serves any number of concurrent readers and writers; the
//! six summary statistics fan out as independent concurrent queries with
//! first-failure-wins semantics. The only cross-instance coordination
//! point is the TTL-bearing refresh lock, acquired fail-fast so no
//! operation ever blocks waiting for it.

pub mod cli;
pub mod error;
pub mod lock;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod pseudonym;
pub mod refresh;
pub mod scheduler;
pub mod service;
pub mod store;

pub use cli::{Args, ServiceConfiguration};
pub use error::{Result, StatsError};
pub use lock::{LockGuard, MemoryLock, RefreshLock};
pub use metrics::{
    MetricRefresher, MetricSnapshot, MetricsOrchestrator, RefreshTimer, SnapshotGauge,
    SnapshotPublisher,
};
pub use model::{CalculationRecord, CalculationRequest, CalculationSummary, TimeWindow};
pub use pseudonym::{Clock, KeyedSessionHasher, SessionHasher, SystemClock};
pub use refresh::{RefreshCoordinator, RefreshOutcome, REFRESH_LOCK_ID};
pub use scheduler::RefreshScheduler;
pub use service::CalculationService;
pub use store::{CalculationRepository, MemoryStore};

/// The current version of the statistics service, from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Sensible defaults for the refresh loop and lock, chosen for a service
/// whose records arrive at human pace: the loop wakes once a minute and
/// only recomputes when something arrived within the last five.
pub mod defaults {
    /// Delay before the first refresh tick, giving the process time to
    /// settle before it starts competing for the lock.
    pub const REFRESH_INITIAL_DELAY: &str = "30s";

    /// Interval between refresh ticks.
    pub const REFRESH_INTERVAL: &str = "60s";

    /// Maximum age of the newest record for a refresh to still be
    /// worthwhile. Older than this means nothing new arrived since the
    /// last recomputation.
    pub const STALENESS_THRESHOLD: &str = "5m";

    /// Time-to-live on the refresh lock: long enough to cover a slow
    /// recomputation, short enough that a crashed holder does not starve
    /// the loop.
    pub const LOCK_TTL: &str = "30s";
}
