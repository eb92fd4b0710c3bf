//! Last-point anomaly scoring service.

pub mod client;

use thiserror::Error;

use crate::detect::series::{CostPoint, CostSeries};

pub use self::client::AnomalyDetectorClient;

/// Sensitivity (0-100) submitted with every scoring request.
pub const DEFAULT_SENSITIVITY: u8 = 65;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("series too short for scoring: need {needed} points, have {have}")]
    InsufficientPoints { needed: usize, have: usize },

    #[error("scoring request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The scoring service's judgement of a series' latest point.
#[derive(Debug, Clone, PartialEq)]
pub struct LastPointVerdict {
    pub is_anomaly: bool,
    /// The scored point, as submitted.
    pub last_point: CostPoint,
    /// Baseline the service expected for the last point.
    pub expected_value: f64,
}

/// Scores whether the latest point of a daily series is anomalous.
///
/// Implementations must be safe to call concurrently for different categories.
#[async_trait::async_trait]
pub trait Scorer: Send + Sync {
    async fn detect_last_point(
        &self,
        series: &CostSeries,
        sensitivity: u8,
    ) -> Result<LastPointVerdict, ScoringError>;
}
