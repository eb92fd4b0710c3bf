//! API route definitions.

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/runs", get(list_runs))
        .route("/runs/latest", get(latest_run))
        .route("/schedule/dry-run", get(schedule_dry_run))
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn latest_run(State(state): State<AppState>) -> Json<Value> {
    match state.history.latest().await {
        Some(entry) => Json(json!({ "data": entry })),
        None => Json(json!({ "data": null, "meta": { "message": "no detection runs yet" } })),
    }
}

async fn list_runs(State(state): State<AppState>) -> Json<Value> {
    let runs = state.history.list().await;
    let total = runs.len();
    Json(json!({ "data": runs, "meta": { "total": total } }))
}

#[derive(Debug, Deserialize)]
struct DryRunParams {
    hours: Option<u64>,
}

async fn schedule_dry_run(
    State(state): State<AppState>,
    Query(params): Query<DryRunParams>,
) -> Json<Value> {
    let hours = params.hours.unwrap_or(24);
    let upcoming: Vec<String> = state
        .trigger
        .preview(&chrono::Utc::now(), hours)
        .iter()
        .map(|t| t.to_rfc3339())
        .collect();
    Json(json!({ "data": { "cron": state.trigger.expr(), "hours": hours, "upcoming": upcoming } }))
}
