use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info};

use crate::billing::CostSource;
use crate::detect::context::DetectionContext;
use crate::detect::evaluator::evaluate;
use crate::detect::series::{group_by_category, CostSeries};
use crate::detect::sparse::apply_sparse_policy;
use crate::detect::{DetectError, DetectionEvent, MIN_SCORING_POINTS};
use crate::scoring::{Scorer, DEFAULT_SENSITIVITY};

/// Lazily evaluated outcomes of one run, one category at a time.
///
/// `Err` items are scoped to a single category; later categories are still
/// evaluated. Categories that produce nothing to report are skipped.
pub type DetectionEvents<'a> = BoxStream<'a, Result<DetectionEvent, DetectError>>;

/// Sequences cost retrieval, series preparation and scoring for a run.
#[derive(Clone)]
pub struct AnomalyEngine {
    source: Arc<dyn CostSource>,
    scorer: Arc<dyn Scorer>,
    sensitivity: u8,
}

impl AnomalyEngine {
    pub fn new(source: Arc<dyn CostSource>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            source,
            scorer,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: u8) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Detect anomalies in the latest day's cost for every resource category.
    ///
    /// Cost records for the context's window are fetched up front; a retrieval
    /// failure aborts the run. Scoring happens as the returned stream is polled.
    pub async fn detect_for_last_day<'a>(
        &'a self,
        ctx: &'a DetectionContext,
    ) -> Result<DetectionEvents<'a>, DetectError> {
        let (from, to) = ctx.window();
        info!(
            day = %ctx.day_to_check(),
            %from,
            %to,
            subscription = %ctx.subscription_id(),
            "Running cost anomaly detection"
        );

        let records = self
            .source
            .fetch_costs(ctx.subscription_id(), from, to)
            .await?;
        let series = group_by_category(records);
        debug!(categories = series.len(), "grouped cost records");

        let events = stream::iter(series)
            .filter_map(move |s| async move { self.evaluate_series(ctx, s).await })
            .boxed();
        Ok(events)
    }

    async fn evaluate_series(
        &self,
        ctx: &DetectionContext,
        series: CostSeries,
    ) -> Option<Result<DetectionEvent, DetectError>> {
        if series.len() < MIN_SCORING_POINTS {
            return Some(Ok(apply_sparse_policy(ctx, &series)));
        }

        match self.scorer.detect_last_point(&series, self.sensitivity).await {
            Ok(verdict) => {
                debug!(
                    category = %series.category(),
                    is_anomaly = verdict.is_anomaly,
                    expected = verdict.expected_value,
                    "scored last point"
                );
                evaluate(ctx, series.category(), &verdict)
                    .map(|anomaly| Ok(DetectionEvent::Anomaly(anomaly)))
            }
            Err(source) => Some(Err(DetectError::Scoring {
                category: series.category().to_string(),
                source,
            })),
        }
    }
}
