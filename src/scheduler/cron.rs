use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;

const MAX_PREVIEW_HOURS: u64 = 24 * 366;

/// Cron-based trigger for detection runs, evaluated in UTC.
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    expr: String,
    schedule: CronSchedule,
}

impl DailyTrigger {
    /// Parse a six-field cron expression (seconds first).
    pub fn new(cron_expr: &str) -> Result<Self> {
        let schedule = CronSchedule::from_str(cron_expr)
            .map_err(|e| anyhow::anyhow!("Invalid cron expression '{}': {}", cron_expr, e))?;
        Ok(Self {
            expr: cron_expr.to_string(),
            schedule,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Next fire time strictly after `now`.
    pub fn next_after(&self, now: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(now).next()
    }

    /// Fire times within the next `hours` hours after `now`.
    /// This is strictly a dry-run preview, not the execution loop.
    pub fn preview(&self, now: &DateTime<Utc>, hours: u64) -> Vec<DateTime<Utc>> {
        let end = *now + chrono::Duration::hours(hours.min(MAX_PREVIEW_HOURS) as i64);
        self.schedule
            .after(now)
            .take_while(|t| *t <= end)
            .collect()
    }
}
