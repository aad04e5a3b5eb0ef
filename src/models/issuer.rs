use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical reference record for a traded (or tradeable) organisation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issuer {
    pub id: Uuid,
    pub legal_name: String,
    pub short_names: Vec<String>,
    pub ticker: String,
    pub isin: Option<String>,
    pub board: Option<String>,
    pub sector_id: Option<String>,
    pub country_code: String,
    pub is_traded: bool,
}
