use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::errors::AppError;
use crate::models::OutboxStatus;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/outbox", get(outbox_stats)).route("/aliases/tombstone", post(tombstone_alias))
}

#[derive(Serialize)]
struct OutboxStats {
    pending: i64,
    sent: i64,
    failed: i64,
    dead_lettered: i64,
}

/// Relay health at a glance (spec.md §4.11), surfaced the way the teacher's
/// `admin` routes expose job/cache state for operators.
async fn outbox_stats(State(state): State<AppState>) -> Result<Json<OutboxStats>, AppError> {
    let counts = db::outbox_queries::count_by_status(&state.pool).await?;
    let mut stats = OutboxStats { pending: 0, sent: 0, failed: 0, dead_lettered: 0 };
    for (status, count) in counts {
        match status {
            OutboxStatus::Pending => stats.pending = count,
            OutboxStatus::Sent => stats.sent = count,
            OutboxStatus::Failed => stats.failed = count,
            OutboxStatus::DeadLettered => stats.dead_lettered = count,
        }
    }
    Ok(Json(stats))
}

#[derive(Deserialize)]
struct TombstoneRequest {
    normalized: String,
}

/// Operator action on a curated Alias (spec.md §4.5 "operator may tombstone
/// curated entries"). The in-process `AliasCache` is not updated here: it
/// is read-mostly and reloaded on restart, matching spec.md §5's
/// copy-on-write snapshot discipline for this rare, operator-driven path.
async fn tombstone_alias(
    State(state): State<AppState>,
    Json(req): Json<TombstoneRequest>,
) -> Result<StatusCode, AppError> {
    db::alias_queries::tombstone(&state.pool, &req.normalized).await?;
    Ok(StatusCode::NO_CONTENT)
}
