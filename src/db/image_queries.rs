use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ContentHash, Image};

const COLUMNS: &str = "id, digest, content_type, byte_len, thumbnail_digest, created_at";

pub async fn find_by_digest(pool: &PgPool, digest: &ContentHash) -> Result<Option<Image>, AppError> {
    let image = sqlx::query_as::<_, Image>(&format!("SELECT {COLUMNS} FROM images WHERE digest = $1"))
        .bind(digest)
        .fetch_optional(pool)
        .await?;
    Ok(image)
}

/// Content-addressed insert: the digest uniqueness constraint makes this
/// idempotent under races, matching the dedup-by-digest contract in
/// spec.md §4.3 "Image handling".
pub async fn insert(
    pool: &PgPool,
    digest: ContentHash,
    content_type: &str,
    byte_len: i64,
    thumbnail_digest: ContentHash,
) -> Result<Image, AppError> {
    let id = Uuid::new_v4();
    let image = sqlx::query_as::<_, Image>(&format!(
        "INSERT INTO images (id, digest, content_type, byte_len, thumbnail_digest, created_at)
         VALUES ($1, $2, $3, $4, $5, now())
         ON CONFLICT (digest) DO UPDATE SET digest = EXCLUDED.digest
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(digest)
    .bind(content_type)
    .bind(byte_len)
    .bind(thumbnail_digest)
    .fetch_one(pool)
    .await?;
    Ok(image)
}

pub async fn link_to_news(pool: &PgPool, news_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
    sqlx::query("INSERT INTO news_images (news_id, image_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(news_id)
        .bind(image_id)
        .execute(pool)
        .await?;
    Ok(())
}
