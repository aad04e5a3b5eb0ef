use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    unenriched_backlog: i64,
}

/// Liveness probe that also surfaces the back-pressure signal adapters
/// watch (spec.md §5 "Back-pressure": `max_backlog`), so an operator can
/// tell "up" apart from "up but drowning" at a glance.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    info!("GET /health");
    let unenriched_backlog = db::news_queries::count_unenriched(&state.pool).await?;
    Ok(Json(HealthResponse { status: "OK", unenriched_backlog }))
}
