use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{EnrichmentStatus, InsertOutcome, NewOutboxEntry, News, RawNews};
use crate::services::antispam_service::AntispamResult;

const COLUMNS: &str = "id, source_id, external_id, title, text, summary, published_at, \
     detected_at, url, lang, content_hash, dedup_status, is_ad, ad_score, ad_reasons, \
     enrichment_status, sector_code, country_code, news_type, news_subtype";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<News>, sqlx::Error> {
    sqlx::query_as::<_, News>(&format!("SELECT {COLUMNS} FROM news WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Most recently detected News first, for the read/ops HTTP surface
/// (spec.md §1 "queried in near real-time").
pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<News>, sqlx::Error> {
    sqlx::query_as::<_, News>(&format!(
        "SELECT {COLUMNS} FROM news ORDER BY detected_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Atomically inserts a News row (co-writing its `news.created` Outbox
/// entry in the same unit of work, spec.md §4.3) and resolves dedup against
/// both unique constraints (spec.md §3, invariant 1). Image co-write is the
/// caller's responsibility once bytes have been fetched (`image_service`).
pub async fn try_insert(
    pool: &PgPool,
    raw: &RawNews,
    antispam: &AntispamResult,
) -> Result<InsertOutcome, AppError> {
    let content_hash = raw.content_hash();
    let mut tx = pool.begin().await?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    let inserted = sqlx::query_as::<_, News>(&format!(
        "INSERT INTO news ({COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'winner', $12, $13, $14, 'pending', \
         NULL, NULL, NULL, NULL)
         ON CONFLICT (content_hash) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(raw.source_id)
    .bind(&raw.external_id)
    .bind(&raw.title)
    .bind(&raw.text)
    .bind(&raw.summary)
    .bind(raw.published_at)
    .bind(now)
    .bind(&raw.url)
    .bind(detect_lang(&raw.title, &raw.text))
    .bind(content_hash)
    .bind(antispam.is_ad)
    .bind(antispam.score)
    .bind(&antispam.reasons)
    .fetch_optional(&mut *tx)
    .await;

    let news = match inserted {
        Ok(Some(news)) => news,
        Ok(None) => {
            tx.rollback().await.ok();
            return Ok(InsertOutcome::DuplicateOnHash);
        }
        Err(sqlx::Error::Database(db_err)) if is_external_id_conflict(db_err.as_ref()) => {
            tx.rollback().await.ok();
            return Ok(InsertOutcome::DuplicateOnExternalId);
        }
        Err(e) => return Err(e.into()),
    };

    insert_outbox(&mut tx, &NewOutboxEntry::news_created(news.id)).await?;
    tx.commit().await?;

    Ok(InsertOutcome::Inserted)
}

fn is_external_id_conflict(db_err: &dyn sqlx::error::DatabaseError) -> bool {
    db_err.constraint() == Some("news_source_id_external_id_key")
}

async fn insert_outbox(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &NewOutboxEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO outbox (id, topic, payload, status, retries, next_attempt_at, created_at)
         VALUES ($1, $2, $3, 'pending', 0, $4, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(&entry.topic)
    .bind(&entry.payload)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Cheap heuristic: Cyrillic-majority text is tagged `ru`, else `en`. The
/// antispam rule set and CMNLN text markers are Russian-centric (spec.md
/// §9 Open Question, left unspecified for non-Russian news upstream).
fn detect_lang(title: &str, text: &str) -> String {
    let sample = format!("{title} {text}");
    let cyrillic = sample.chars().filter(|c| matches!(*c, '\u{0400}'..='\u{04FF}')).count();
    let latin = sample.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if cyrillic >= latin {
        "ru".to_string()
    } else {
        "en".to_string()
    }
}

pub async fn mark_enriched(
    pool: &PgPool,
    id: Uuid,
    summary: Option<String>,
    status: EnrichmentStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE news SET summary = COALESCE($2, summary), enrichment_status = $3 WHERE id = $1")
        .bind(id)
        .bind(summary)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_ad(
    pool: &PgPool,
    id: Uuid,
    is_ad: bool,
    ad_score: f64,
    ad_reasons: Vec<String>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE news SET is_ad = $2, ad_score = $3, ad_reasons = $4 WHERE id = $1")
        .bind(id)
        .bind(is_ad)
        .bind(ad_score)
        .bind(ad_reasons)
        .execute(pool)
        .await?;
    Ok(())
}

/// Writes the Classifier's (C8) per-item outputs (spec.md §4.6). Takes a
/// generic executor so `topic_queries::replace_topics` can run it inside
/// the same transaction as the `topics` row replacement.
pub async fn set_classification<'e, E>(
    executor: E,
    news_id: Uuid,
    sector_code: Option<&str>,
    country_code: Option<&str>,
    news_type: crate::models::NewsType,
    news_subtype: crate::models::NewsSubtype,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "UPDATE news SET sector_code = $2, country_code = $3, news_type = $4, news_subtype = $5 WHERE id = $1",
    )
    .bind(news_id)
    .bind(sector_code)
    .bind(country_code)
    .bind(news_type)
    .bind(news_subtype)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn count_unenriched(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM news WHERE enrichment_status = 'pending'")
        .fetch_one(pool)
        .await
}

/// Claims a batch of unenriched News for one worker, using a row-level
/// lock that skips rows already claimed by another worker (spec.md §4.3
/// `stream_unenriched`), and flips them to `InProgress` in the same
/// statement so no two workers ever claim the same row.
pub async fn claim_unenriched_batch(pool: &PgPool, batch_size: i64) -> Result<Vec<News>, sqlx::Error> {
    sqlx::query_as::<_, News>(&format!(
        "UPDATE news SET enrichment_status = 'in_progress'
         WHERE id IN (
             SELECT id FROM news
             WHERE enrichment_status = 'pending'
             ORDER BY published_at
             LIMIT $1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING {COLUMNS}"
    ))
    .bind(batch_size)
    .fetch_all(pool)
    .await
}
