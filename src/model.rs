//! Data model for calculation records, summary reports and window filters.
//!
//! `CalculationRecord` is the immutable persisted fact; its serde
//! representation is the exact document shape written to the record store
//! (camelCase keys, `saving` omitted entirely when absent rather than
//! written as null). `TimeWindow` carries the half-open `[from, to)`
//! filter that every aggregate query applies identically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One recorded calculation outcome.
///
/// Created once by the calculation service at save time and never mutated
/// or deleted afterwards. No uniqueness is enforced: one session token may
/// appear on any number of records (one browsing session, possibly many
/// calculations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    /// Pseudonymised session token; the original identifier is never stored.
    pub session_id: String,
    pub annual_salary: Decimal,
    pub year1_estimated_nic: Decimal,
    pub year2_estimated_nic: Decimal,
    /// Integer-valued saving figure used by every aggregation.
    pub rounded_saving: Decimal,
    /// Unrounded precise saving. Stored when supplied, never aggregated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Inbound calculation payload. Carries no identity; consumed once to
/// build a `CalculationRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub annual_salary: Decimal,
    pub year1_estimated_nic: Decimal,
    pub year2_estimated_nic: Decimal,
    pub rounded_saving: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving: Option<Decimal>,
}

/// Half-open `[from, to)` instant range applied to aggregate queries.
///
/// Both bounds are optional and independent; an absent bound leaves that
/// side unbounded, and the default window matches every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Window matching every record.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Lower bound is inclusive, upper bound is exclusive.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if timestamp >= to {
                return false;
            }
        }
        true
    }
}

/// Computed-on-demand statistical report over one window.
///
/// All six statistics are computed independently over the same filtered
/// record set; the requested bounds are echoed back unchanged for
/// auditability. An empty filtered set yields zero-valued results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    pub number_of_calculations: u64,
    pub number_of_unique_sessions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_calculations_with_no_savings: Option<u64>,
    pub total_savings: Decimal,
    /// Sum, over sessions, of that session's mean rounded saving. Each
    /// session is weighted equally regardless of how many records it
    /// contributed, so this is NOT the same as `total_savings`.
    pub total_savings_averaged_by_session: Decimal,
    pub average_salary: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn window_lower_bound_inclusive_upper_exclusive() {
        let window = TimeWindow::new(Some(at(100)), Some(at(200)));
        assert!(window.contains(at(100)));
        assert!(window.contains(at(199)));
        assert!(!window.contains(at(200)));
        assert!(!window.contains(at(99)));
    }

    #[test]
    fn window_open_sides() {
        assert!(TimeWindow::unbounded().contains(at(0)));

        let from_only = TimeWindow::new(Some(at(50)), None);
        assert!(from_only.contains(at(1_000_000)));
        assert!(!from_only.contains(at(49)));

        let to_only = TimeWindow::new(None, Some(at(50)));
        assert!(to_only.contains(at(0)));
        assert!(!to_only.contains(at(50)));
    }

    #[test]
    fn record_document_shape_omits_absent_saving() {
        let record = CalculationRecord {
            session_id: "token".into(),
            annual_salary: dec!(35000),
            year1_estimated_nic: dec!(2500.50),
            year2_estimated_nic: dec!(2600.75),
            rounded_saving: dec!(100),
            saving: None,
            timestamp: at(1_700_000_000),
        };

        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("saving"));
        assert!(object.contains_key("sessionId"));
        assert!(object.contains_key("annualSalary"));
        assert!(object.contains_key("year1EstimatedNic"));
        assert!(object.contains_key("year2EstimatedNic"));
        assert!(object.contains_key("roundedSaving"));
    }

    #[test]
    fn record_document_shape_keeps_present_saving() {
        let record = CalculationRecord {
            session_id: "token".into(),
            annual_salary: dec!(35000),
            year1_estimated_nic: dec!(2500),
            year2_estimated_nic: dec!(2600),
            rounded_saving: dec!(100),
            saving: Some(dec!(100.4875)),
            timestamp: at(1_700_000_000),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["saving"], serde_json::json!("100.4875"));
    }

    #[test]
    fn request_saving_defaults_to_absent() {
        let request: CalculationRequest = serde_json::from_str(
            r#"{"annualSalary":"40000","year1EstimatedNic":"3000",
                "year2EstimatedNic":"3100","roundedSaving":"150"}"#,
        )
        .unwrap();
        assert_eq!(request.saving, None);
        assert_eq!(request.rounded_saving, dec!(150));
    }
}
