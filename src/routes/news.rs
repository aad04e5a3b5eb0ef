use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{Entity, Event, LinkedCompany, News, Topic};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_news)).route("/:id", get(get_news))
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

async fn list_news(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Vec<News>>, AppError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let news = db::news_queries::list_recent(&state.pool, limit).await?;
    Ok(Json(news))
}

#[derive(Serialize)]
struct NewsDetail {
    news: News,
    entities: Vec<Entity>,
    topics: Vec<Topic>,
    linked_companies: Vec<LinkedCompany>,
    events: Vec<Event>,
}

/// Full enrichment record for one News item (spec.md §3: News, Entity,
/// Topic, LinkedCompany, Event all key off `news_id`), assembled with one
/// query per child table rather than a join since each maps to a distinct
/// Rust type.
async fn get_news(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<NewsDetail>, AppError> {
    let news = db::news_queries::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("news {id}")))?;

    let entities = db::entity_queries::find_by_news(&state.pool, id).await?;
    let topics = db::topic_queries::find_by_news(&state.pool, id).await?;
    let linked_companies = db::linked_company_queries::find_by_news(&state.pool, id).await?;
    let events = db::event_queries::find_by_news(&state.pool, id).await?;

    Ok(Json(NewsDetail { news, entities, topics, linked_companies, events }))
}
