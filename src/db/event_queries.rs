use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Event, EventType, NewEvent};

/// Manual row mapping: `r#type` is stored in the `type` column and `attrs`
/// is `jsonb`, so `Event` does not derive `sqlx::FromRow` directly (see the
/// doc comment on `Event`).
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    news_id: Uuid,
    r#type: EventType,
    title: String,
    ts: DateTime<Utc>,
    attrs: serde_json::Value,
    is_anchor: bool,
    confidence: f64,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            news_id: row.news_id,
            r#type: row.r#type,
            title: row.title,
            ts: row.ts,
            attrs: serde_json::from_value(row.attrs).unwrap_or_default(),
            is_anchor: row.is_anchor,
            confidence: row.confidence,
        }
    }
}

const COLUMNS: &str = "id, news_id, type, title, ts, attrs, is_anchor, confidence";

pub async fn insert(pool: &PgPool, news_id: Uuid, new_event: NewEvent) -> Result<Event, sqlx::Error> {
    let id = Uuid::new_v4();
    let attrs = serde_json::to_value(&new_event.attrs).unwrap_or(serde_json::Value::Null);

    let row = sqlx::query_as::<_, EventRow>(&format!(
        "INSERT INTO events ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(news_id)
    .bind(new_event.r#type)
    .bind(&new_event.title)
    .bind(new_event.ts)
    .bind(attrs)
    .bind(new_event.is_anchor)
    .bind(new_event.confidence)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
    let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {COLUMNS} FROM events WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Into::into))
}

pub async fn find_by_news(pool: &PgPool, news_id: Uuid) -> Result<Vec<Event>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(&format!("SELECT {COLUMNS} FROM events WHERE news_id = $1"))
        .bind(news_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Every Event with `ts` in `[from, to)`, ordered for the CMNLN engine's
/// forward/retroactive candidate search (spec.md §4.8 steps 1 and 3).
pub async fn find_in_window(pool: &PgPool, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {COLUMNS} FROM events WHERE ts >= $1 AND ts < $2 ORDER BY ts"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
