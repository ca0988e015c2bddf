//! Published metric snapshot and refresh timing.
//!
//! The refresh operation recomputes five operational values over the
//! whole store (no window), truncates each toward zero into an integer
//! and republishes the result as one `MetricSnapshot`. How long each
//! refresh took is recorded into an HDR histogram regardless of outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StatsError};
use crate::model::TimeWindow;
use crate::pseudonym::Clock;
use crate::store::CalculationRepository;

/// The externally published aggregate values, recomputed by each refresh.
/// Every value is integer-truncated and computed over all records ever
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub number_of_calculations: i64,
    pub number_of_unique_sessions: i64,
    pub total_savings: i64,
    pub total_savings_averaged_by_session: i64,
    pub average_salary: i64,
    pub refreshed_at: DateTime<Utc>,
}

/// Where a recomputed snapshot goes.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    async fn publish(&self, snapshot: &MetricSnapshot) -> Result<()>;
}

/// Recomputes and republishes the metric snapshot. The refresh
/// coordinator drives this behind its lock.
#[async_trait]
pub trait MetricRefresher: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// Production publisher: keeps the latest snapshot observable in-process,
/// emits it as a tracing event, and optionally mirrors it as JSON to a
/// configured path for external dashboards.
#[derive(Default)]
pub struct SnapshotGauge {
    latest: RwLock<Option<MetricSnapshot>>,
    output_path: Option<PathBuf>,
}

impl SnapshotGauge {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self {
            latest: RwLock::new(None),
            output_path,
        }
    }

    pub fn latest(&self) -> Option<MetricSnapshot> {
        self.latest.read().clone()
    }
}

#[async_trait]
impl SnapshotPublisher for SnapshotGauge {
    async fn publish(&self, snapshot: &MetricSnapshot) -> Result<()> {
        info!(
            calculations = snapshot.number_of_calculations,
            unique_sessions = snapshot.number_of_unique_sessions,
            total_savings = snapshot.total_savings,
            averaged_savings = snapshot.total_savings_averaged_by_session,
            average_salary = snapshot.average_salary,
            "metric snapshot refreshed"
        );

        if let Some(path) = &self.output_path {
            let json = serde_json::to_string_pretty(snapshot)
                .map_err(|e| StatsError::Refresh(format!("snapshot encoding: {e}")))?;
            tokio::fs::write(path, json)
                .await
                .map_err(|e| StatsError::Refresh(format!("snapshot write: {e}")))?;
        }

        *self.latest.write() = Some(snapshot.clone());
        Ok(())
    }
}

/// Truncate toward zero, saturating at the i64 range. These are
/// operational gauges, not money movement, so saturation beats failing
/// the whole refresh.
fn truncated(value: Decimal) -> i64 {
    value.trunc().to_i64().unwrap_or_else(|| {
        if value.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

/// Recomputes the snapshot from the repository and hands it to the
/// publisher.
pub struct MetricsOrchestrator {
    repository: Arc<dyn CalculationRepository>,
    publisher: Arc<dyn SnapshotPublisher>,
    clock: Arc<dyn Clock>,
}

impl MetricsOrchestrator {
    pub fn new(
        repository: Arc<dyn CalculationRepository>,
        publisher: Arc<dyn SnapshotPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            publisher,
            clock,
        }
    }
}

#[async_trait]
impl MetricRefresher for MetricsOrchestrator {
    async fn refresh(&self) -> Result<()> {
        let window = TimeWindow::unbounded();
        let repository = &self.repository;
        let (calculations, unique_sessions, total, averaged, salary) = tokio::try_join!(
            repository.number_of_calculations(window),
            repository.number_of_unique_sessions(window),
            repository.total_savings(window),
            repository.total_savings_averaged_by_session(window),
            repository.average_salary(window),
        )?;

        let snapshot = MetricSnapshot {
            number_of_calculations: calculations as i64,
            number_of_unique_sessions: unique_sessions as i64,
            total_savings: truncated(total),
            total_savings_averaged_by_session: truncated(averaged),
            average_salary: truncated(salary),
            refreshed_at: self.clock.now(),
        };
        self.publisher.publish(&snapshot).await
    }
}

/// Refresh-duration statistics for operator reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TimerStatistics {
    pub samples: u64,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
}

/// Wall-clock timer over refresh attempts.
///
/// Single writer (the coordinator); concurrent reads are benign. Values
/// are recorded in milliseconds with 3 significant figures.
pub struct RefreshTimer {
    histogram: Mutex<Histogram<u64>>,
}

impl RefreshTimer {
    pub fn new() -> Result<Self> {
        let histogram = Histogram::<u64>::new(3)
            .map_err(|e| StatsError::Refresh(format!("timer histogram: {e}")))?;
        Ok(Self {
            histogram: Mutex::new(histogram),
        })
    }

    pub fn record(&self, elapsed: Duration) {
        self.histogram
            .lock()
            .saturating_record(elapsed.as_millis() as u64);
    }

    pub fn statistics(&self) -> TimerStatistics {
        let histogram = self.histogram.lock();
        TimerStatistics {
            samples: histogram.len(),
            mean_ms: histogram.mean(),
            p50_ms: histogram.value_at_percentile(50.0),
            p95_ms: histogram.value_at_percentile(95.0),
            max_ms: histogram.max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CalculationRecord;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn record(session: &str, saving: Decimal, secs: i64) -> CalculationRecord {
        CalculationRecord {
            session_id: session.to_string(),
            annual_salary: dec!(30000),
            year1_estimated_nic: dec!(2000),
            year2_estimated_nic: dec!(2100),
            rounded_saving: saving,
            saving: None,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(truncated(dec!(1650.5)), 1650);
        assert_eq!(truncated(dec!(-1650.5)), -1650);
        assert_eq!(truncated(dec!(0)), 0);
    }

    #[tokio::test]
    async fn refresh_publishes_unwindowed_truncated_values() {
        let store = Arc::new(MemoryStore::new());
        for r in [
            record("a", dec!(100), 10),
            record("a", dec!(201), 20),
            record("b", dec!(1000), 30),
            record("b", dec!(2000), 40),
        ] {
            store.save(r).await.unwrap();
        }

        let gauge = Arc::new(SnapshotGauge::new(None));
        let instant = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let orchestrator = MetricsOrchestrator::new(
            store,
            Arc::clone(&gauge) as Arc<dyn SnapshotPublisher>,
            Arc::new(FixedClock(instant)),
        );

        orchestrator.refresh().await.unwrap();

        let snapshot = gauge.latest().unwrap();
        assert_eq!(snapshot.number_of_calculations, 4);
        assert_eq!(snapshot.number_of_unique_sessions, 2);
        assert_eq!(snapshot.total_savings, 3301);
        // 150.5 + 1500 = 1650.5, truncated
        assert_eq!(snapshot.total_savings_averaged_by_session, 1650);
        assert_eq!(snapshot.average_salary, 30000);
        assert_eq!(snapshot.refreshed_at, instant);
    }

    #[tokio::test]
    async fn gauge_mirrors_the_snapshot_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let gauge = SnapshotGauge::new(Some(path.clone()));

        let snapshot = MetricSnapshot {
            number_of_calculations: 4,
            number_of_unique_sessions: 2,
            total_savings: 3301,
            total_savings_averaged_by_session: 1650,
            average_salary: 30000,
            refreshed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        gauge.publish(&snapshot).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["numberOfCalculations"], 4);
        assert_eq!(written["totalSavingsAveragedBySession"], 1650);
        assert_eq!(gauge.latest(), Some(snapshot));
    }

    #[test]
    fn timer_accumulates_samples() {
        let timer = RefreshTimer::new().unwrap();
        timer.record(Duration::from_millis(12));
        timer.record(Duration::from_millis(30));

        let stats = timer.statistics();
        assert_eq!(stats.samples, 2);
        assert!(stats.mean_ms > 0.0);
        assert!(stats.max_ms >= 30);
    }
}
