/// Failure taxonomy for the statistics subsystem.
///
/// Lock contention is deliberately absent: losing the refresh lock to a
/// sibling instance is a normal skip outcome, not an error (see
/// `refresh::RefreshOutcome`).
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The caller did not supply a session identifier on save.
    /// Pseudonymisation requires one; this is a caller error and no
    /// record is written.
    #[error("session identifier missing")]
    MissingSessionId,

    /// An underlying record-store operation failed. Propagated to the
    /// immediate caller without retry; a summary in flight aborts on the
    /// first such failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The metric recomputation failed. Observed and logged by the
    /// refresh coordinator, never propagated past it.
    #[error("metrics refresh failed: {0}")]
    Refresh(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
