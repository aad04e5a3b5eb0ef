use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{CausalEdge, Event};
use crate::services::ceg_engine;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", get(get_event)).route("/:id/chain", get(get_chain))
}

async fn get_event(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Event>, AppError> {
    let event = db::event_queries::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("event {id}")))?;
    Ok(Json(event))
}

#[derive(Deserialize)]
struct ChainQuery {
    /// `forward` walks CAUSES edges downstream (default); `backward` walks
    /// them upstream to find what caused `id`.
    direction: Option<String>,
    depth: Option<usize>,
    min_confidence: Option<f64>,
}

#[derive(Serialize)]
struct ChainResponse {
    paths: Vec<Vec<Uuid>>,
}

/// BFS causal-chain traversal from one Event (spec.md §4.8 "Termination &
/// chains"), reading the full CAUSES edge set back out of the graph store.
async fn get_chain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<ChainQuery>,
) -> Result<Json<ChainResponse>, AppError> {
    let forward = q.direction.as_deref() != Some("backward");
    let depth = q.depth.unwrap_or(state.config.ceg.max_chain_depth);

    let edges: Vec<CausalEdge> =
        state.graph_store.causal_edges().await.map_err(|e| AppError::DownstreamFailure(e.to_string()))?;

    let paths = ceg_engine::causal_chain(&edges, id, depth, q.min_confidence, forward);
    Ok(Json(ChainResponse { paths }))
}
