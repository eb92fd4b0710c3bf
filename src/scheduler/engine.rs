use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::run::run_detection;
use crate::scheduler::history::{HistoryEntry, RunHistory, RunStatus};
use crate::scheduler::DailyTrigger;

/// Main scheduler execution loop.
///
/// Sleeps until the trigger's next fire time, performs one detection run and
/// records the outcome. A failed run is logged and never stops the loop.
pub async fn run_scheduler_loop(
    trigger: DailyTrigger,
    config: AppConfig,
    http: Client,
    history: RunHistory,
) {
    info!(cron = %trigger.expr(), "Scheduler engine started");

    if config.schedule.run_on_startup {
        run_and_record(&config, &http, &history).await;
    }

    loop {
        let now = Utc::now();
        let Some(next) = trigger.next_after(&now) else {
            warn!(cron = %trigger.expr(), "Schedule has no future fire times; scheduler stopping");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next.to_rfc3339(), "Waiting for next detection run");
        tokio::time::sleep(wait).await;

        run_and_record(&config, &http, &history).await;
    }
}

async fn run_and_record(config: &AppConfig, http: &Client, history: &RunHistory) {
    let started_at = Utc::now();
    let entry = match run_detection(config, http, None).await {
        Ok(summary) => HistoryEntry {
            status: RunStatus::Success,
            started_at,
            finished_at: Utc::now(),
            summary: Some(summary),
            error: None,
        },
        Err(e) => {
            error!("Detection run failed: {:#}", e);
            HistoryEntry {
                status: RunStatus::Failed,
                started_at,
                finished_at: Utc::now(),
                summary: None,
                error: Some(format!("{:#}", e)),
            }
        }
    };
    history.record(entry).await;
}
