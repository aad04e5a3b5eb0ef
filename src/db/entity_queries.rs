use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Entity, EntityKind, NewEntity};

/// Persists every per-news extraction record in one transaction (spec.md
/// §4.4 step 2). Entities are deleted in cascade with their parent News via
/// the foreign key (spec.md §3), so there is no corresponding delete query.
pub async fn insert_many(pool: &PgPool, news_id: Uuid, entities: &[NewEntity]) -> Result<(), sqlx::Error> {
    if entities.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for entity in entities {
        sqlx::query(
            "INSERT INTO entities (id, news_id, kind, raw_text, normalized, confidence, attrs)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(news_id)
        .bind(entity.kind)
        .bind(&entity.raw_text)
        .bind(&entity.normalized)
        .bind(entity.confidence)
        .bind(&entity.attrs)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn find_by_news(pool: &PgPool, news_id: Uuid) -> Result<Vec<Entity>, sqlx::Error> {
    sqlx::query_as::<_, Entity>(
        "SELECT id, news_id, kind, raw_text, normalized, confidence, attrs
         FROM entities WHERE news_id = $1",
    )
    .bind(news_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_news_and_kind(
    pool: &PgPool,
    news_id: Uuid,
    kind: EntityKind,
) -> Result<Vec<Entity>, sqlx::Error> {
    sqlx::query_as::<_, Entity>(
        "SELECT id, news_id, kind, raw_text, normalized, confidence, attrs
         FROM entities WHERE news_id = $1 AND kind = $2",
    )
    .bind(news_id)
    .bind(kind)
    .fetch_all(pool)
    .await
}
