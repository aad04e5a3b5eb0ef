use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewOutboxEntry, OutboxRow};

const COLUMNS: &str = "id, topic, payload, status, retries, next_attempt_at, created_at";

/// Used outside the News/Event co-write transactions (e.g. the CMNLN
/// engine's standalone `event.caused` emission) — callers that need the
/// outbox write inside their own transaction use `news_queries`'s private
/// helper instead.
pub async fn insert(pool: &PgPool, entry: &NewOutboxEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO outbox (id, topic, payload, status, retries, next_attempt_at, created_at)
         VALUES ($1, $2, $3, 'pending', 0, $4, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(&entry.topic)
    .bind(&entry.payload)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Claims a batch of due `Pending` rows via skip-locked (spec.md §4.11
/// step 1), letting multiple relay partitions run concurrently without
/// double-publishing.
pub async fn claim_due_batch(pool: &PgPool, batch_size: i64) -> Result<Vec<OutboxRow>, sqlx::Error> {
    sqlx::query_as::<_, OutboxRow>(&format!(
        "SELECT {COLUMNS} FROM outbox
         WHERE id IN (
             SELECT id FROM outbox
             WHERE status IN ('pending', 'failed') AND next_attempt_at <= now()
             ORDER BY created_at
             LIMIT $1
             FOR UPDATE SKIP LOCKED
         )"
    ))
    .bind(batch_size)
    .fetch_all(pool)
    .await
}

pub async fn mark_sent(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET status = 'sent' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_dead_lettered(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET status = 'dead_lettered' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn schedule_retry(
    pool: &PgPool,
    id: Uuid,
    retries: i32,
    next_attempt_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox SET status = 'failed', retries = $2, next_attempt_at = $3 WHERE id = $1")
        .bind(id)
        .bind(retries)
        .bind(next_attempt_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Row counts by disposition, for the ops HTTP surface's outbox health view.
pub async fn count_by_status(pool: &PgPool) -> Result<Vec<(OutboxStatus, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT status, count(*) FROM outbox GROUP BY status")
        .fetch_all(pool)
        .await
}

pub async fn purge_sent_older_than(pool: &PgPool, keep_days: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM outbox WHERE status = 'sent' AND created_at < now() - make_interval(days => $1)")
        .bind(keep_days as i32)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
