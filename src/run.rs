//! A single detection run: wiring, logging and the run summary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::billing::{CostManagementClient, TokenProvider};
use crate::config::AppConfig;
use crate::detect::context::DetectionContext;
use crate::detect::engine::AnomalyEngine;
use crate::detect::report::{dispatch, AnomalyReporter};
use crate::detect::{AnomalyKind, AnomalyVerdict, DetectError};
use crate::scoring::AnomalyDetectorClient;

/// An anomaly as handed to alerting consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyAlert {
    pub category: String,
    pub date: NaiveDate,
    /// Cost rounded to cents.
    pub amount: f64,
    pub kind: AnomalyKind,
    /// Deduplication key, identical across runs for the same anomaly.
    pub detection_id: String,
}

impl From<&AnomalyVerdict> for AnomalyAlert {
    fn from(verdict: &AnomalyVerdict) -> Self {
        Self {
            category: verdict.category.clone(),
            date: verdict.date,
            amount: (verdict.amount * 100.0).round() / 100.0,
            kind: verdict.kind,
            detection_id: verdict.detection_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCategory {
    pub category: String,
    pub error: String,
}

/// Outcome of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub day_checked: NaiveDate,
    pub period_days: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub alerts: Vec<AnomalyAlert>,
    pub not_enough_values: Vec<String>,
    pub failed_categories: Vec<FailedCategory>,
}

/// Logs each outcome and keeps it for the summary.
#[derive(Debug, Default)]
struct RunRecorder {
    alerts: Vec<AnomalyAlert>,
    not_enough_values: Vec<String>,
    failed_categories: Vec<FailedCategory>,
}

impl AnomalyReporter for RunRecorder {
    fn on_anomaly_detected(&mut self, verdict: &AnomalyVerdict) {
        let alert = AnomalyAlert::from(verdict);
        error!(
            category = %alert.category,
            kind = %alert.kind,
            detection_id = %alert.detection_id,
            "Anomaly for {} value ${:.2} at {}",
            alert.category,
            alert.amount,
            alert.date
        );
        self.alerts.push(alert);
    }

    fn on_not_enough_values(&mut self, category: &str) {
        warn!("Not enough values: {}", category);
        self.not_enough_values.push(category.to_string());
    }

    fn on_category_failed(&mut self, err: &DetectError) {
        let category = err.category().unwrap_or_default().to_string();
        error!(%category, error = %err, "Category evaluation failed");
        self.failed_categories.push(FailedCategory {
            category,
            error: err.to_string(),
        });
    }
}

/// Run detection for `ctx` and collect every outcome.
///
/// Only run-level failures (token or cost retrieval) are returned as errors.
pub async fn execute_run(
    engine: &AnomalyEngine,
    ctx: &DetectionContext,
) -> Result<RunSummary, DetectError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, day = %ctx.day_to_check(), "Detection run started");

    let events = engine.detect_for_last_day(ctx).await?;
    let mut recorder = RunRecorder::default();
    dispatch(events, &mut recorder).await;

    let summary = RunSummary {
        run_id,
        day_checked: ctx.day_to_check(),
        period_days: ctx.period_days(),
        started_at,
        finished_at: Utc::now(),
        alerts: recorder.alerts,
        not_enough_values: recorder.not_enough_values,
        failed_categories: recorder.failed_categories,
    };
    info!(
        %run_id,
        alerts = summary.alerts.len(),
        not_enough_values = summary.not_enough_values.len(),
        failed = summary.failed_categories.len(),
        "Detection run finished"
    );
    Ok(summary)
}

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the HTTP client shared by the billing and scoring collaborators.
///
/// Create one per process and hand clones to each collaborator; clones share
/// the same connection pool.
pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("costanomaly/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
}

/// Build an engine backed by Cost Management and the Anomaly Detector service.
pub fn engine_from_config(config: &AppConfig, http: &Client) -> AnomalyEngine {
    let azure = &config.azure;
    let tokens = TokenProvider::new(
        &azure.login_endpoint,
        &azure.tenant_id,
        &azure.client_id,
        &azure.client_secret,
        &azure.management_endpoint,
    );
    let source = CostManagementClient::new(
        http.clone(),
        &azure.management_endpoint,
        &azure.api_version,
        tokens,
    );
    let scorer =
        AnomalyDetectorClient::new(http.clone(), &config.scoring.endpoint, &config.scoring.key);

    AnomalyEngine::new(Arc::new(source), Arc::new(scorer))
        .with_sensitivity(config.detection.sensitivity)
}

/// Context for checking `day`, or the configured days back from `now`.
pub fn context_from_config(
    config: &AppConfig,
    now: DateTime<Utc>,
    day: Option<NaiveDate>,
) -> Result<DetectionContext> {
    let d = &config.detection;
    let subscription = config.azure.subscription_id.as_str();
    match day {
        Some(day) => Ok(DetectionContext::new(
            day,
            &d.period,
            subscription,
            d.cost_alert_threshold,
            d.report_drops,
        )),
        None => DetectionContext::for_days_back(
            now,
            d.days_back,
            &d.period,
            subscription,
            d.cost_alert_threshold,
            d.report_drops,
        )
        .with_context(|| format!("detection.days_back {} is out of range", d.days_back)),
    }
}

/// Validate `config` and perform one run against the live services.
pub async fn run_detection(
    config: &AppConfig,
    http: &Client,
    day: Option<NaiveDate>,
) -> Result<RunSummary> {
    config.validate()?;
    let ctx = context_from_config(config, Utc::now(), day)?;
    let engine = engine_from_config(config, http);
    let summary = execute_run(&engine, &ctx).await?;
    Ok(summary)
}
