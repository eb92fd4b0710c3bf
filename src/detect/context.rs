//! Per-run detection parameters.

use chrono::{DateTime, Days, NaiveDate, Utc};

use super::period::parse_period_days;

/// Immutable parameters for one detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionContext {
    day_to_check: NaiveDate,
    period_days: u32,
    subscription_id: String,
    cost_alert_threshold: f64,
    report_drops: bool,
}

impl DetectionContext {
    pub fn new(
        day_to_check: NaiveDate,
        period: &str,
        subscription_id: impl Into<String>,
        cost_alert_threshold: f64,
        report_drops: bool,
    ) -> Self {
        Self {
            day_to_check,
            period_days: parse_period_days(period),
            subscription_id: subscription_id.into(),
            cost_alert_threshold,
            report_drops,
        }
    }

    /// Build a context for the day `days_back` days before `now`.
    ///
    /// The sign of `days_back` is ignored and the time of day is dropped, since
    /// billing records carry calendar days only. Returns `None` if the
    /// resulting day is out of range.
    pub fn for_days_back(
        now: DateTime<Utc>,
        days_back: i64,
        period: &str,
        subscription_id: impl Into<String>,
        cost_alert_threshold: f64,
        report_drops: bool,
    ) -> Option<Self> {
        let day = now
            .date_naive()
            .checked_sub_days(Days::new(days_back.unsigned_abs()))?;
        Some(Self::new(
            day,
            period,
            subscription_id,
            cost_alert_threshold,
            report_drops,
        ))
    }

    pub fn day_to_check(&self) -> NaiveDate {
        self.day_to_check
    }

    pub fn period_days(&self) -> u32 {
        self.period_days
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn cost_alert_threshold(&self) -> f64 {
        self.cost_alert_threshold
    }

    pub fn report_drops(&self) -> bool {
        self.report_drops
    }

    /// Inclusive `(from, to)` calendar days of the lookback window.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        let from = self
            .day_to_check
            .checked_sub_days(Days::new(self.period_days.into()))
            .unwrap_or(NaiveDate::MIN);
        (from, self.day_to_check)
    }
}
