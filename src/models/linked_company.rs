use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkedCompany {
    pub news_id: Uuid,
    pub issuer_id: Uuid,
    pub method: LinkMethod,
    pub score: f64,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    AliasExact,
    Fuzzy,
    AutoLearned,
}
