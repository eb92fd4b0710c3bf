//! HTTP adapter for the Anomaly Detector "last point" endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LastPointVerdict, Scorer, ScoringError};
use crate::detect::series::CostSeries;
use crate::detect::MIN_SCORING_POINTS;

const LAST_DETECT_PATH: &str = "anomalydetector/v1.0/timeseries/last/detect";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Client for the Anomaly Detector service, authenticated with an API key.
#[derive(Debug, Clone)]
pub struct AnomalyDetectorClient {
    http: Client,
    endpoint: String,
    key: String,
}

impl AnomalyDetectorClient {
    pub fn new(http: Client, endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }

    fn last_detect_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), LAST_DETECT_PATH)
    }
}

#[derive(Debug, Serialize)]
struct LastDetectRequest {
    series: Vec<WirePoint>,
    granularity: &'static str,
    sensitivity: u8,
}

#[derive(Debug, Serialize)]
struct WirePoint {
    timestamp: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastDetectResponse {
    is_anomaly: bool,
    expected_value: f64,
}

fn build_request(series: &CostSeries, sensitivity: u8) -> LastDetectRequest {
    LastDetectRequest {
        series: series
            .points()
            .iter()
            .map(|p| WirePoint {
                timestamp: format!("{}T00:00:00Z", p.date),
                value: p.amount,
            })
            .collect(),
        granularity: "daily",
        sensitivity,
    }
}

#[async_trait::async_trait]
impl Scorer for AnomalyDetectorClient {
    async fn detect_last_point(
        &self,
        series: &CostSeries,
        sensitivity: u8,
    ) -> Result<LastPointVerdict, ScoringError> {
        let last_point = match series.last() {
            Some(p) if series.len() >= MIN_SCORING_POINTS => *p,
            _ => {
                return Err(ScoringError::InsufficientPoints {
                    needed: MIN_SCORING_POINTS,
                    have: series.len(),
                })
            }
        };

        let url = self.last_detect_url();
        debug!(
            category = %series.category(),
            points = series.len(),
            %url,
            "submitting series for scoring"
        );

        let response = self
            .http
            .post(&url)
            .header(KEY_HEADER, &self.key)
            .json(&build_request(series, sensitivity))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: LastDetectResponse = response.json().await?;
        Ok(LastPointVerdict {
            is_anomaly: parsed.is_anomaly,
            last_point,
            expected_value: parsed.expected_value,
        })
    }
}
