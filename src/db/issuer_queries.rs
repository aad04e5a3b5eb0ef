use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::SecurityMatch;
use crate::models::Issuer;

const COLUMNS: &str = "id, legal_name, short_names, ticker, isin, board, sector_id, country_code, is_traded";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Issuer>, sqlx::Error> {
    sqlx::query_as::<_, Issuer>(&format!("SELECT {COLUMNS} FROM issuers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_ticker(pool: &PgPool, ticker: &str) -> Result<Option<Issuer>, sqlx::Error> {
    sqlx::query_as::<_, Issuer>(&format!("SELECT {COLUMNS} FROM issuers WHERE ticker = $1"))
        .bind(ticker)
        .fetch_optional(pool)
        .await
}

/// Ground every LinkedCompany in an existing Issuer (spec.md §3 invariant:
/// "every LinkedCompany resolves to an existing Issuer at commit time").
/// Securities Master responses (§6.3) carry no country code; new issuers
/// default to the domestic market this engine tracks, matching the
/// Russian-centric securities master the Linker targets.
pub async fn upsert_from_security_match(pool: &PgPool, security: &SecurityMatch) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let row = sqlx::query_as::<_, Issuer>(&format!(
        "INSERT INTO issuers (id, legal_name, short_names, ticker, isin, board, sector_id, country_code, is_traded)
         VALUES ($1, $2, $3, $4, $5, $6, NULL, 'RU', $7)
         ON CONFLICT (ticker) DO UPDATE SET
             legal_name = EXCLUDED.legal_name,
             isin = COALESCE(EXCLUDED.isin, issuers.isin),
             board = COALESCE(EXCLUDED.board, issuers.board),
             is_traded = EXCLUDED.is_traded
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&security.name)
    .bind(vec![security.shortname.clone()])
    .bind(&security.secid)
    .bind(&security.isin)
    .bind(&security.board)
    .bind(security.is_traded)
    .fetch_one(pool)
    .await?;

    Ok(row.id)
}
