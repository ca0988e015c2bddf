//! Business-level orchestration over the aggregation repository.
//!
//! `CalculationService` owns the two caller-facing operations: persisting
//! one calculation outcome (pseudonymise, timestamp, insert) and composing
//! the six summary statistics into one report. It holds no state of its
//! own beyond the injected collaborators.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, StatsError};
use crate::model::{CalculationRecord, CalculationRequest, CalculationSummary, TimeWindow};
use crate::pseudonym::{Clock, SessionHasher};
use crate::store::CalculationRepository;

pub struct CalculationService {
    repository: Arc<dyn CalculationRepository>,
    hasher: Arc<dyn SessionHasher>,
    clock: Arc<dyn Clock>,
}

impl CalculationService {
    pub fn new(
        repository: Arc<dyn CalculationRepository>,
        hasher: Arc<dyn SessionHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            hasher,
            clock,
        }
    }

    /// Persist one calculation outcome.
    ///
    /// A missing or blank session identifier is a caller error: the
    /// repository is never touched and no record is written. Field ranges
    /// are deliberately not validated here — out-of-range values are
    /// stored as-is and validation stays with upstream callers.
    pub async fn save(
        &self,
        session_id: Option<&str>,
        request: CalculationRequest,
    ) -> Result<()> {
        let session_id = session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(StatsError::MissingSessionId)?;

        let record = CalculationRecord {
            session_id: self.hasher.pseudonymise(session_id),
            annual_salary: request.annual_salary,
            year1_estimated_nic: request.year1_estimated_nic,
            year2_estimated_nic: request.year2_estimated_nic,
            rounded_saving: request.rounded_saving,
            saving: request.saving,
            timestamp: self.clock.now(),
        };
        self.repository.save(record).await
    }

    /// Compute the six summary statistics over one window.
    ///
    /// The queries fan out concurrently and the first failure wins: the
    /// join aborts before later futures are polled, so their repository
    /// calls are never issued and no partial summary is ever returned.
    /// The requested bounds are echoed into the report unchanged.
    pub async fn summary(&self, window: TimeWindow) -> Result<CalculationSummary> {
        let repository = &self.repository;
        let (
            number_of_calculations,
            number_of_unique_sessions,
            number_of_calculations_with_no_savings,
            total_savings,
            total_savings_averaged_by_session,
            average_salary,
        ) = tokio::try_join!(
            repository.number_of_calculations(window),
            repository.number_of_unique_sessions(window),
            repository.number_of_calculations_with_no_savings(window),
            repository.total_savings(window),
            repository.total_savings_averaged_by_session(window),
            repository.average_salary(window),
        )?;

        debug!(
            calculations = number_of_calculations,
            sessions = number_of_unique_sessions,
            "summary computed"
        );

        Ok(CalculationSummary {
            from: window.from,
            to: window.to,
            number_of_calculations,
            number_of_unique_sessions,
            number_of_calculations_with_no_savings: Some(number_of_calculations_with_no_savings),
            total_savings,
            total_savings_averaged_by_session,
            average_salary,
        })
    }
}
