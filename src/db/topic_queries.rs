use sqlx::PgPool;
use uuid::Uuid;

use crate::db::news_queries;
use crate::models::{Classification, Topic};

/// Replaces the `topics` rows for a News (at most 3, spec.md §3) and the
/// News-level classifier outputs (sector/country/type/subtype) in one
/// transaction (spec.md §4.4 step 4).
pub async fn replace_topics(pool: &PgPool, news_id: Uuid, classification: &Classification) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM topics WHERE news_id = $1")
        .bind(news_id)
        .execute(&mut *tx)
        .await?;

    for topic in classification.topics.iter().take(3) {
        sqlx::query(
            "INSERT INTO topics (news_id, code, confidence, is_primary) VALUES ($1, $2, $3, $4)",
        )
        .bind(topic.news_id)
        .bind(&topic.code)
        .bind(topic.confidence)
        .bind(topic.is_primary)
        .execute(&mut *tx)
        .await?;
    }

    news_queries::set_classification(
        &mut *tx,
        news_id,
        classification.sector_code.as_deref(),
        classification.country_code.as_deref(),
        classification.news_type,
        classification.news_subtype,
    )
    .await?;

    tx.commit().await
}

pub async fn find_by_news(pool: &PgPool, news_id: Uuid) -> Result<Vec<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(
        "SELECT news_id, code, confidence, is_primary FROM topics WHERE news_id = $1",
    )
    .bind(news_id)
    .fetch_all(pool)
    .await
}
