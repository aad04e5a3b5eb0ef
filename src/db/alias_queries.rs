use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Alias;

const COLUMNS: &str = "normalized_string, issuer_id, origin, confidence, tombstoned, created_at";

/// Loaded once at startup into the in-process `AliasCache` (spec.md §5
/// "Shared resources"): curated entries take precedence over learned ones
/// on a lookup collision, so tombstoned rows are excluded entirely.
pub async fn fetch_all_active(pool: &PgPool) -> Result<Vec<Alias>, sqlx::Error> {
    sqlx::query_as::<_, Alias>(&format!(
        "SELECT {COLUMNS} FROM aliases WHERE tombstoned = false"
    ))
    .fetch_all(pool)
    .await
}

/// Learned aliases are monotonic: a later `learn` for the same normalized
/// string only ever raises confidence, never lowers it (spec.md §4.5).
pub async fn insert_learned(
    pool: &PgPool,
    normalized: &str,
    issuer_id: Uuid,
    confidence: f64,
) -> Result<Alias, AppError> {
    let row = sqlx::query_as::<_, Alias>(&format!(
        "INSERT INTO aliases (normalized_string, issuer_id, origin, confidence, tombstoned, created_at)
         VALUES ($1, $2, 'learned', $3, false, now())
         ON CONFLICT (normalized_string) DO UPDATE SET
             confidence = GREATEST(aliases.confidence, EXCLUDED.confidence)
         RETURNING {COLUMNS}"
    ))
    .bind(normalized)
    .bind(issuer_id)
    .bind(confidence)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Operator action: curated entries may be tombstoned but never silently
/// overwritten by the linker (spec.md §4.5).
pub async fn tombstone(pool: &PgPool, normalized: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE aliases SET tombstoned = true WHERE normalized_string = $1 AND origin = 'curated'")
        .bind(normalized)
        .execute(pool)
        .await?;
    Ok(())
}

#[allow(dead_code)]
pub async fn insert_curated(pool: &PgPool, normalized: &str, issuer_id: Uuid) -> Result<Alias, sqlx::Error> {
    sqlx::query_as::<_, Alias>(&format!(
        "INSERT INTO aliases (normalized_string, issuer_id, origin, confidence, tombstoned, created_at)
         VALUES ($1, $2, 'curated', 1.0, false, now())
         RETURNING {COLUMNS}"
    ))
    .bind(normalized)
    .bind(issuer_id)
    .fetch_one(pool)
    .await
}
