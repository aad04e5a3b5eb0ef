use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::Source;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sources))
        .route("/:id/enable", post(enable_source))
        .route("/:id/disable", post(disable_source))
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>, AppError> {
    let sources = db::source_queries::list_all(&state.pool).await?;
    Ok(Json(sources))
}

/// Operator re-enable after a source was auto-paused on exhausting
/// `max_channel_retries` (spec.md §4.1).
async fn enable_source(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    db::source_queries::set_enabled(&state.pool, id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn disable_source(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    db::source_queries::set_enabled(&state.pool, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}
