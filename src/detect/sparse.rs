//! Policy for series too short to score.

use super::context::DetectionContext;
use super::series::CostSeries;
use super::{AnomalyKind, AnomalyVerdict, DetectionEvent};

/// Decide the outcome for a series below the scoring minimum.
///
/// A newly created or rarely billed resource is flagged when its latest cost
/// is above the alert threshold and falls on the day being checked. Such
/// anomalies are always spikes. Everything else is reported as lacking history.
pub fn apply_sparse_policy(ctx: &DetectionContext, series: &CostSeries) -> DetectionEvent {
    match series.last() {
        Some(last)
            if last.amount > ctx.cost_alert_threshold() && last.date == ctx.day_to_check() =>
        {
            DetectionEvent::Anomaly(AnomalyVerdict {
                category: series.category().to_string(),
                date: last.date,
                amount: last.amount,
                kind: AnomalyKind::Spike,
            })
        }
        _ => DetectionEvent::NotEnoughValues {
            category: series.category().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::series::{group_by_category, CostRecord};
    use chrono::{Days, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn series_ending(last_day: NaiveDate, len: u64, last_amount: f64) -> CostSeries {
        let records = (0..len).map(|i| CostRecord {
            category: "Storage".to_string(),
            date: last_day.checked_sub_days(Days::new(len - 1 - i)).unwrap(),
            amount: if i == len - 1 { last_amount } else { 10.0 },
        });
        group_by_category(records).remove(0)
    }

    fn ctx(threshold: f64, report_drops: bool) -> DetectionContext {
        DetectionContext::new(today(), "90 days", "sub", threshold, report_drops)
    }

    #[test]
    fn test_new_resource_above_threshold_is_spike() {
        let series = series_ending(today(), 11, 100.0);
        match apply_sparse_policy(&ctx(50.0, false), &series) {
            DetectionEvent::Anomaly(v) => {
                assert_eq!(v.kind, AnomalyKind::Spike);
                assert_eq!(v.amount, 100.0);
                assert_eq!(v.date, today());
                assert_eq!(v.category, "Storage");
            }
            other => panic!("expected anomaly, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_last_day_is_not_enough_values() {
        let yesterday = today().pred_opt().unwrap();
        let series = series_ending(yesterday, 11, 100.0);
        assert_eq!(
            apply_sparse_policy(&ctx(50.0, false), &series),
            DetectionEvent::NotEnoughValues { category: "Storage".to_string() }
        );
    }

    #[test]
    fn test_below_threshold_is_not_enough_values() {
        let series = series_ending(today(), 3, 50.0);
        assert_eq!(
            apply_sparse_policy(&ctx(50.0, true), &series),
            DetectionEvent::NotEnoughValues { category: "Storage".to_string() }
        );
    }

    #[test]
    fn test_never_reports_drops() {
        // falling costs, latest still above threshold, drops enabled
        let amounts = [500.0, 420.0, 350.0, 240.0, 60.0];
        let records = amounts.iter().enumerate().map(|(i, &amount)| CostRecord {
            category: "Sql".to_string(),
            date: today().checked_sub_days(Days::new(4 - i as u64)).unwrap(),
            amount,
        });
        let series = group_by_category(records).remove(0);

        match apply_sparse_policy(&ctx(50.0, true), &series) {
            DetectionEvent::Anomaly(v) => {
                assert_eq!(v.kind, AnomalyKind::Spike);
                assert_eq!(v.amount, 60.0);
            }
            other => panic!("expected a spike, got {:?}", other),
        }
    }
}
