use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{LinkMethod, LinkedCompany};

const COLUMNS: &str = "news_id, issuer_id, method, score, is_primary";

pub async fn insert(
    pool: &PgPool,
    news_id: Uuid,
    issuer_id: Uuid,
    method: LinkMethod,
    score: f64,
    is_primary: bool,
) -> Result<LinkedCompany, sqlx::Error> {
    sqlx::query_as::<_, LinkedCompany>(&format!(
        "INSERT INTO linked_companies (news_id, issuer_id, method, score, is_primary)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (news_id, issuer_id) DO UPDATE SET
             method = EXCLUDED.method, score = EXCLUDED.score, is_primary = EXCLUDED.is_primary
         RETURNING {COLUMNS}"
    ))
    .bind(news_id)
    .bind(issuer_id)
    .bind(method)
    .bind(score)
    .bind(is_primary)
    .fetch_one(pool)
    .await
}

pub async fn find_by_news(pool: &PgPool, news_id: Uuid) -> Result<Vec<LinkedCompany>, sqlx::Error> {
    sqlx::query_as::<_, LinkedCompany>(&format!(
        "SELECT {COLUMNS} FROM linked_companies WHERE news_id = $1"
    ))
    .bind(news_id)
    .fetch_all(pool)
    .await
}
