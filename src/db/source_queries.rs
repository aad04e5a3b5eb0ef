use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Source;

const COLUMNS: &str = "id, code, kind, display_name, base_locator, trust_level, enabled, config, \
     last_external_id, last_poll_at, error_count, backfill_completed";

/// Every enabled Source, used by `main.rs` to spawn one polling task each
/// (spec.md §5 "Scheduling": one polling task per enabled source).
pub async fn list_enabled(pool: &PgPool) -> Result<Vec<Source>, sqlx::Error> {
    sqlx::query_as::<_, Source>(&format!(
        "SELECT {COLUMNS} FROM sources WHERE enabled = true ORDER BY code"
    ))
    .fetch_all(pool)
    .await
}

/// Every configured source regardless of `enabled`, for the ops HTTP surface.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Source>, sqlx::Error> {
    sqlx::query_as::<_, Source>(&format!("SELECT {COLUMNS} FROM sources ORDER BY code"))
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Source>, sqlx::Error> {
    sqlx::query_as::<_, Source>(&format!("SELECT {COLUMNS} FROM sources WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Source>, sqlx::Error> {
    sqlx::query_as::<_, Source>(&format!("SELECT {COLUMNS} FROM sources WHERE code = $1"))
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Owned exclusively by the polling task for that source (spec.md §5
/// "Shared resources"): persists the cursor after every successful flush.
pub async fn advance_cursor(pool: &PgPool, id: Uuid, new_cursor: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE sources SET last_external_id = $2, last_poll_at = $3 WHERE id = $1",
    )
    .bind(id)
    .bind(new_cursor)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn increment_error_count(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sources SET error_count = error_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Channel-not-found / permission failures exhaust `max_channel_retries`
/// and the source is paused until an operator re-enables it (spec.md §4.1).
pub async fn mark_unhealthy(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sources SET enabled = false WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_backfill_completed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sources SET backfill_completed = true WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Operator control (spec.md §4.1 failure disposition is automatic;
/// re-enabling a paused source is a manual ops action).
pub async fn set_enabled(pool: &PgPool, id: Uuid, enabled: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sources SET enabled = $2, error_count = 0 WHERE id = $1")
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;
    Ok(())
}
