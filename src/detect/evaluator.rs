//! Threshold and recency gate over scoring verdicts.

use super::context::DetectionContext;
use super::{AnomalyKind, AnomalyVerdict};
use crate::scoring::LastPointVerdict;

/// Turn a scoring verdict into a reportable anomaly, if it passes the gate.
///
/// The last point must be flagged by the service, cost more than the alert
/// threshold, and fall exactly on the day being checked. A series whose
/// latest billing data predates that day stays silent. Drops are only
/// reported when the context enables them.
pub fn evaluate(
    ctx: &DetectionContext,
    category: &str,
    verdict: &LastPointVerdict,
) -> Option<AnomalyVerdict> {
    let last = verdict.last_point;
    if !verdict.is_anomaly
        || last.amount <= ctx.cost_alert_threshold()
        || last.date != ctx.day_to_check()
    {
        return None;
    }

    let kind = if last.amount < verdict.expected_value {
        AnomalyKind::Drop
    } else {
        AnomalyKind::Spike
    };
    if kind == AnomalyKind::Drop && !ctx.report_drops() {
        return None;
    }

    Some(AnomalyVerdict {
        category: category.to_string(),
        date: last.date,
        amount: last.amount,
        kind,
    })
}
