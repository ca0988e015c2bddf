//! Record-store access layer.
//!
//! `CalculationRepository` is the seam between the statistics logic and
//! whatever engine holds the records. It owns the translation of windowed
//! statistical requests into store operations: callers hand it a
//! `TimeWindow` and get back numeric results, never raw records. The
//! half-open `[from, to)` semantics hold identically across every
//! aggregate operation.
//!
//! One backend ships here: `memory::MemoryStore`, an append-only
//! document store with a timestamp-ordered index. Remote backends plug in
//! behind the same trait.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{CalculationRecord, TimeWindow};

pub mod memory;

pub use memory::MemoryStore;

/// Persistence and windowed aggregation over calculation records.
///
/// Implementations must serve any number of concurrent readers and
/// writers; records are append-only from this interface's perspective.
/// Any underlying store failure surfaces as `StatsError::Storage` with no
/// retry — retry, if any, is the caller's concern.
#[async_trait]
pub trait CalculationRepository: Send + Sync {
    /// Insert one record. No deduplication and no validation beyond the
    /// caller's construction.
    async fn save(&self, record: CalculationRecord) -> Result<()>;

    /// The record with the maximum timestamp across the entire store,
    /// ignoring any window. `None` when the store is empty. Used by the
    /// refresh coordinator's recency check.
    async fn last_calculation(&self) -> Result<Option<CalculationRecord>>;

    /// Count of records matching the window.
    async fn number_of_calculations(&self, window: TimeWindow) -> Result<u64>;

    /// Count of distinct session tokens among matching records, by exact
    /// token equality.
    async fn number_of_unique_sessions(&self, window: TimeWindow) -> Result<u64>;

    /// Sum of `rounded_saving` over matching records; 0 when none match.
    async fn total_savings(&self, window: TimeWindow) -> Result<Decimal>;

    /// For each distinct session among matching records, the mean
    /// `rounded_saving` across that session's matching records, summed
    /// across sessions. Each session weighs equally regardless of how many
    /// records it contributed. 0 when none match.
    async fn total_savings_averaged_by_session(&self, window: TimeWindow) -> Result<Decimal>;

    /// Mean `annual_salary` over matching records, truncated toward zero;
    /// 0 when none match.
    async fn average_salary(&self, window: TimeWindow) -> Result<Decimal>;

    /// Count of matching records where `rounded_saving` is zero.
    async fn number_of_calculations_with_no_savings(&self, window: TimeWindow) -> Result<u64>;
}
