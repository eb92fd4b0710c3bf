//! Delivery of detection outcomes to the caller.

use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use tracing::error;

use super::{AnomalyKind, AnomalyVerdict, DetectError, DetectionEvent};

/// Receives the outcomes of a detection run as they are produced.
pub trait AnomalyReporter {
    fn on_anomaly_detected(&mut self, verdict: &AnomalyVerdict);

    fn on_not_enough_values(&mut self, category: &str);

    /// A single category could not be evaluated. The run carries on with
    /// the remaining categories.
    fn on_category_failed(&mut self, error: &DetectError) {
        error!(category = ?error.category(), error = %error, "Category evaluation failed");
    }
}

/// Adapts a pair of closures into an [`AnomalyReporter`].
pub struct CallbackReporter<A, N> {
    on_anomaly: A,
    on_not_enough: N,
}

impl<A, N> CallbackReporter<A, N>
where
    A: FnMut(&str, NaiveDate, f64, AnomalyKind),
    N: FnMut(&str),
{
    pub fn new(on_anomaly: A, on_not_enough: N) -> Self {
        Self {
            on_anomaly,
            on_not_enough,
        }
    }
}

impl<A, N> AnomalyReporter for CallbackReporter<A, N>
where
    A: FnMut(&str, NaiveDate, f64, AnomalyKind),
    N: FnMut(&str),
{
    fn on_anomaly_detected(&mut self, verdict: &AnomalyVerdict) {
        (self.on_anomaly)(&verdict.category, verdict.date, verdict.amount, verdict.kind);
    }

    fn on_not_enough_values(&mut self, category: &str) {
        (self.on_not_enough)(category);
    }
}

/// Drain `events`, invoking the reporter for each one in order.
pub async fn dispatch<S, R>(events: S, reporter: &mut R)
where
    S: Stream<Item = Result<DetectionEvent, DetectError>>,
    R: AnomalyReporter + ?Sized,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(DetectionEvent::Anomaly(verdict)) => reporter.on_anomaly_detected(&verdict),
            Ok(DetectionEvent::NotEnoughValues { category }) => {
                reporter.on_not_enough_values(&category)
            }
            Err(e) => reporter.on_category_failed(&e),
        }
    }
}
