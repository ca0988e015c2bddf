//! In-memory record-store backend.
//!
//! Documents live in an append-only `BTreeMap` keyed by
//! `(timestamp, insertion sequence)` — the timestamp-ordered index that
//! serves both the windowed range scans and the latest-record lookup. The
//! insertion sequence disambiguates concurrent writes carrying the same
//! timestamp, so no record is ever silently overwritten.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{CalculationRecord, TimeWindow};
use crate::store::CalculationRepository;

type IndexKey = (DateTime<Utc>, u64);

/// Append-only document store with a timestamp index.
pub struct MemoryStore {
    records: RwLock<BTreeMap<IndexKey, CalculationRecord>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Run `f` over the records matching `window`, in timestamp order.
    ///
    /// The range bounds translate the half-open window directly onto the
    /// index: `(to, 0)` as an excluded upper bound rejects every key at
    /// `to` or later, whatever its insertion sequence.
    fn scan<R>(
        &self,
        window: TimeWindow,
        f: impl FnOnce(&mut dyn Iterator<Item = &CalculationRecord>) -> R,
    ) -> R {
        let records = self.records.read();
        let lower = match window.from {
            Some(from) => Bound::Included((from, u64::MIN)),
            None => Bound::Unbounded,
        };
        let upper = match window.to {
            Some(to) => Bound::Excluded((to, u64::MIN)),
            None => Bound::Unbounded,
        };
        let mut matching = records.range((lower, upper)).map(|(_, record)| record);
        f(&mut matching)
    }

    /// Per-session `(sum, count)` of rounded savings over the window.
    fn savings_by_session(&self, window: TimeWindow) -> HashMap<String, (Decimal, u64)> {
        self.scan(window, |records| {
            let mut sessions: HashMap<String, (Decimal, u64)> = HashMap::new();
            for record in records {
                let entry = sessions
                    .entry(record.session_id.clone())
                    .or_insert((Decimal::ZERO, 0));
                entry.0 += record.rounded_saving;
                entry.1 += 1;
            }
            sessions
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalculationRepository for MemoryStore {
    async fn save(&self, record: CalculationRecord) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.records
            .write()
            .insert((record.timestamp, sequence), record);
        Ok(())
    }

    async fn last_calculation(&self) -> Result<Option<CalculationRecord>> {
        Ok(self.records.read().values().next_back().cloned())
    }

    async fn number_of_calculations(&self, window: TimeWindow) -> Result<u64> {
        Ok(self.scan(window, |records| records.count() as u64))
    }

    async fn number_of_unique_sessions(&self, window: TimeWindow) -> Result<u64> {
        Ok(self.scan(window, |records| {
            records
                .map(|record| record.session_id.as_str())
                .collect::<HashSet<_>>()
                .len() as u64
        }))
    }

    async fn total_savings(&self, window: TimeWindow) -> Result<Decimal> {
        Ok(self.scan(window, |records| {
            records.map(|record| record.rounded_saving).sum()
        }))
    }

    async fn total_savings_averaged_by_session(&self, window: TimeWindow) -> Result<Decimal> {
        // Sum of per-session means: each session weighs equally no matter
        // how many records it contributed.
        let total = self
            .savings_by_session(window)
            .values()
            .map(|(sum, count)| *sum / Decimal::from(*count))
            .sum();
        Ok(total)
    }

    async fn average_salary(&self, window: TimeWindow) -> Result<Decimal> {
        let (sum, count) = self.scan(window, |records| {
            records.fold((Decimal::ZERO, 0u64), |(sum, count), record| {
                (sum + record.annual_salary, count + 1)
            })
        });
        if count == 0 {
            return Ok(Decimal::ZERO);
        }
        Ok((sum / Decimal::from(count)).trunc())
    }

    async fn number_of_calculations_with_no_savings(&self, window: TimeWindow) -> Result<u64> {
        Ok(self.scan(window, |records| {
            records.filter(|record| record.rounded_saving.is_zero()).count() as u64
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(session: &str, saving: Decimal, secs: i64) -> CalculationRecord {
        CalculationRecord {
            session_id: session.to_string(),
            annual_salary: dec!(30000),
            year1_estimated_nic: dec!(2000),
            year2_estimated_nic: dec!(2100),
            rounded_saving: saving,
            saving: None,
            timestamp: at(secs),
        }
    }

    async fn seeded(records: Vec<CalculationRecord>) -> MemoryStore {
        let store = MemoryStore::new();
        for r in records {
            store.save(r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn empty_store_yields_zeroes_not_errors() {
        let store = MemoryStore::new();
        let window = TimeWindow::unbounded();

        assert_eq!(store.last_calculation().await.unwrap(), None);
        assert_eq!(store.number_of_calculations(window).await.unwrap(), 0);
        assert_eq!(store.number_of_unique_sessions(window).await.unwrap(), 0);
        assert_eq!(store.total_savings(window).await.unwrap(), Decimal::ZERO);
        assert_eq!(
            store
                .total_savings_averaged_by_session(window)
                .await
                .unwrap(),
            Decimal::ZERO
        );
        assert_eq!(store.average_salary(window).await.unwrap(), Decimal::ZERO);
        assert_eq!(
            store
                .number_of_calculations_with_no_savings(window)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn window_boundaries_are_half_open() {
        let store = seeded(vec![
            record("a", dec!(10), 99),
            record("a", dec!(10), 100), // == from: included
            record("a", dec!(10), 150),
            record("a", dec!(10), 200), // == to: excluded
        ])
        .await;

        let window = TimeWindow::new(Some(at(100)), Some(at(200)));
        assert_eq!(store.number_of_calculations(window).await.unwrap(), 2);
        assert_eq!(store.total_savings(window).await.unwrap(), dec!(20));
    }

    #[tokio::test]
    async fn open_bounds_are_independent() {
        let store = seeded(vec![
            record("a", dec!(1), 10),
            record("b", dec!(1), 20),
            record("c", dec!(1), 30),
        ])
        .await;

        let from_only = TimeWindow::new(Some(at(20)), None);
        assert_eq!(store.number_of_calculations(from_only).await.unwrap(), 2);

        let to_only = TimeWindow::new(None, Some(at(30)));
        assert_eq!(store.number_of_calculations(to_only).await.unwrap(), 2);

        let unbounded = TimeWindow::unbounded();
        assert_eq!(store.number_of_calculations(unbounded).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unique_sessions_counts_distinct_tokens_in_window() {
        let store = seeded(vec![
            record("a", dec!(1), 10),
            record("a", dec!(2), 20),
            record("b", dec!(3), 30),
            record("c", dec!(4), 99), // outside the window below
        ])
        .await;

        let window = TimeWindow::new(None, Some(at(90)));
        assert_eq!(store.number_of_unique_sessions(window).await.unwrap(), 2);
        assert_eq!(
            store
                .number_of_unique_sessions(TimeWindow::unbounded())
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn averaged_by_session_sums_per_session_means() {
        // Session a contributes {100, 201}, session b {1000, 2000}:
        // mean(a) + mean(b) = 150.5 + 1500 = 1650.5.
        let store = seeded(vec![
            record("a", dec!(100), 10),
            record("a", dec!(201), 20),
            record("b", dec!(1000), 30),
            record("b", dec!(2000), 40),
        ])
        .await;

        let window = TimeWindow::unbounded();
        assert_eq!(
            store
                .total_savings_averaged_by_session(window)
                .await
                .unwrap(),
            dec!(1650.5)
        );
        // Deliberately different from the plain sum.
        assert_eq!(store.total_savings(window).await.unwrap(), dec!(3301));
    }

    #[tokio::test]
    async fn averaged_by_session_respects_the_window() {
        // Only session a's second record falls outside the window, so its
        // in-window mean is just 100.
        let store = seeded(vec![
            record("a", dec!(100), 10),
            record("a", dec!(201), 95),
            record("b", dec!(1000), 30),
            record("b", dec!(2000), 40),
        ])
        .await;

        let window = TimeWindow::new(None, Some(at(90)));
        assert_eq!(
            store
                .total_savings_averaged_by_session(window)
                .await
                .unwrap(),
            dec!(1600)
        );
    }

    #[tokio::test]
    async fn average_salary_truncates_toward_zero() {
        let mut a = record("a", dec!(1), 10);
        a.annual_salary = dec!(10);
        let mut b = record("b", dec!(1), 20);
        b.annual_salary = dec!(25);
        let store = seeded(vec![a, b]).await;

        // mean = 17.5, truncated to 17
        assert_eq!(
            store.average_salary(TimeWindow::unbounded()).await.unwrap(),
            dec!(17)
        );
    }

    #[tokio::test]
    async fn no_savings_counts_zero_valued_records_only() {
        let store = seeded(vec![
            record("a", dec!(0), 10),
            record("b", dec!(0), 20),
            record("c", dec!(5), 30),
        ])
        .await;

        assert_eq!(
            store
                .number_of_calculations_with_no_savings(TimeWindow::unbounded())
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn last_calculation_is_the_maximum_timestamp() {
        // Insertion order deliberately differs from timestamp order.
        let store = seeded(vec![
            record("a", dec!(1), 300),
            record("b", dec!(2), 100),
            record("c", dec!(3), 200),
        ])
        .await;

        let last = store.last_calculation().await.unwrap().unwrap();
        assert_eq!(last.timestamp, at(300));
        assert_eq!(last.session_id, "a");
    }

    #[tokio::test]
    async fn equal_timestamps_never_collide() {
        let store = seeded(vec![
            record("a", dec!(1), 100),
            record("b", dec!(2), 100),
            record("c", dec!(3), 100),
        ])
        .await;

        assert_eq!(
            store
                .number_of_calculations(TimeWindow::unbounded())
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn concurrent_writers_all_land() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for writer in 0..8u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..50i64 {
                    store
                        .save(record(&format!("w{writer}"), dec!(1), i))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store
                .number_of_calculations(TimeWindow::unbounded())
                .await
                .unwrap(),
            400
        );
        assert_eq!(
            store
                .number_of_unique_sessions(TimeWindow::unbounded())
                .await
                .unwrap(),
            8
        );
    }
}
