//! costanomaly -- daily cost anomaly detection for Azure subscriptions.
//!
//! Fetches daily billing records grouped by resource type, scores the most
//! recent day of each category against its history with an external anomaly
//! detection service, and reports spikes and drops above a cost threshold.

pub mod api;
pub mod billing;
pub mod config;
pub mod detect;
pub mod run;
pub mod scheduler;
pub mod scoring;

use anyhow::Result;

use crate::config::AppConfig;

/// Start the costanomaly daemon: scheduler and, if enabled, the status API.
pub async fn serve(config: AppConfig) -> Result<()> {
    config.validate()?;

    let trigger = scheduler::DailyTrigger::new(&config.schedule.cron)?;
    let history = scheduler::RunHistory::new();
    let http = run::http_client()?;

    let scheduler_task = tokio::spawn(scheduler::run_scheduler_loop(
        trigger.clone(),
        config.clone(),
        http,
        history.clone(),
    ));

    if !config.api.enabled {
        scheduler_task.await?;
        return Ok(());
    }

    let addr: std::net::SocketAddr = config.api.listen_address.parse()?;
    let app = api::router(api::state::AppState { history, trigger });

    tracing::info!(%addr, "costanomaly status API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
