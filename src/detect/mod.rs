//! Cost anomaly detection: series preparation, gating policy, and run orchestration.

pub mod context;
pub mod engine;
pub mod evaluator;
pub mod period;
pub mod report;
pub mod series;
pub mod sparse;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::billing::BillingError;
use crate::scoring::ScoringError;

/// Minimum number of daily points the scoring service accepts.
pub const MIN_SCORING_POINTS: usize = 12;

#[derive(Debug, Error)]
pub enum DetectError {
    /// Token acquisition or cost retrieval failed. Aborts the whole run.
    #[error("cost retrieval failed: {0}")]
    Billing(#[from] BillingError),

    /// The scoring call for one category failed. Sibling categories are unaffected.
    #[error("scoring failed for {category}: {source}")]
    Scoring {
        category: String,
        #[source]
        source: ScoringError,
    },
}

impl DetectError {
    /// The resource category this error is scoped to, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            DetectError::Billing(_) => None,
            DetectError::Scoring { category, .. } => Some(category),
        }
    }
}

/// Direction of an anomalous cost relative to the expected baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnomalyKind {
    Spike,
    Drop,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::Spike => write!(f, "Spike"),
            AnomalyKind::Drop => write!(f, "Drop"),
        }
    }
}

/// An anomalous latest-day cost for one resource category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyVerdict {
    pub category: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub kind: AnomalyKind,
}

impl AnomalyVerdict {
    /// Stable key for downstream alert deduplication: `<category>-<date>-<kind>`.
    ///
    /// The same anomaly detected by several runs yields the same key.
    pub fn detection_id(&self) -> String {
        format!("{}-{}-{}", self.category, self.date, self.kind)
    }
}

/// One reportable outcome of a detection run.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionEvent {
    Anomaly(AnomalyVerdict),
    NotEnoughValues { category: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_id_is_stable() {
        let verdict = AnomalyVerdict {
            category: "microsoft.storage/storageaccounts".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            amount: 120.0,
            kind: AnomalyKind::Spike,
        };
        assert_eq!(
            verdict.detection_id(),
            "microsoft.storage/storageaccounts-2024-03-07-Spike"
        );

        let again = AnomalyVerdict { amount: 121.5, ..verdict.clone() };
        assert_eq!(verdict.detection_id(), again.detection_id());
    }

    #[test]
    fn test_error_category_scope() {
        let err = DetectError::Scoring {
            category: "VM".to_string(),
            source: ScoringError::InsufficientPoints { needed: 12, have: 3 },
        };
        assert_eq!(err.category(), Some("VM"));

        let err = DetectError::Billing(BillingError::MalformedResponse("no rows".into()));
        assert_eq!(err.category(), None);
    }
}
