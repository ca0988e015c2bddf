//! Metrics refresh coordination.
//!
//! Decides, on each scheduled tick, whether a metrics recomputation is
//! warranted and executes it at most once across concurrently running
//! instances sharing one store. The decision ladder: skip when there is
//! no data, skip when the newest record is older than the staleness
//! threshold (nothing new to publish), skip when a sibling instance holds
//! the refresh lock. Only then run the refresher under the lock, timing
//! the attempt whatever its outcome. A failed refresh is observed and
//! logged, never propagated — the next tick starts the ladder again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::lock::RefreshLock;
use crate::metrics::{MetricRefresher, RefreshTimer};
use crate::pseudonym::Clock;
use crate::store::CalculationRepository;

/// Lock identifier shared by every instance of the service.
pub const REFRESH_LOCK_ID: &str = "calculation-metrics-refresh";

/// Terminal state of one coordinator tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresher ran and republished the snapshot.
    Refreshed,
    /// No calculation has ever been recorded.
    SkippedNoData,
    /// The newest record predates the staleness threshold; nothing new
    /// to recompute.
    SkippedStale,
    /// A sibling instance holds the refresh lock. Normal, not an error.
    SkippedLockHeld,
    /// The recency check or the refresher failed; logged only.
    Failed,
}

pub struct RefreshCoordinator {
    repository: Arc<dyn CalculationRepository>,
    refresher: Arc<dyn MetricRefresher>,
    lock: Arc<dyn RefreshLock>,
    timer: Arc<RefreshTimer>,
    clock: Arc<dyn Clock>,
    staleness_threshold: Duration,
    lock_ttl: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        repository: Arc<dyn CalculationRepository>,
        refresher: Arc<dyn MetricRefresher>,
        lock: Arc<dyn RefreshLock>,
        timer: Arc<RefreshTimer>,
        clock: Arc<dyn Clock>,
        staleness_threshold: Duration,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            refresher,
            lock,
            timer,
            clock,
            staleness_threshold,
            lock_ttl,
        }
    }

    /// Run one pass of the decision ladder.
    pub async fn tick(&self) -> RefreshOutcome {
        let last = match self.repository.last_calculation().await {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "refresh recency check failed");
                return RefreshOutcome::Failed;
            }
        };

        let Some(last) = last else {
            debug!("no calculations recorded; refresh skipped");
            return RefreshOutcome::SkippedNoData;
        };

        let age = self.clock.now().signed_duration_since(last.timestamp);
        // A record timestamped ahead of our clock counts as fresh.
        let stale = match age.to_std() {
            Ok(age) => age > self.staleness_threshold,
            Err(_) => false,
        };
        if stale {
            debug!(
                last_calculation = %last.timestamp,
                "newest record beyond staleness threshold; refresh skipped"
            );
            return RefreshOutcome::SkippedStale;
        }

        let Some(_guard) = self.lock.acquire(REFRESH_LOCK_ID, self.lock_ttl) else {
            debug!("refresh lock held by another instance; skipped");
            return RefreshOutcome::SkippedLockHeld;
        };

        // Guard held from here; released on drop whatever happens below.
        let started = Instant::now();
        let result = self.refresher.refresh().await;
        let elapsed = started.elapsed();
        self.timer.record(elapsed);

        match result {
            Ok(()) => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "metrics refreshed");
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!(error = %e, "metrics refresh failed; will retry next tick");
                RefreshOutcome::Failed
            }
        }
    }
}
