use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single per-news extraction record. Deleted in cascade with its parent News.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entity {
    pub id: Uuid,
    pub news_id: Uuid,
    pub kind: EntityKind,
    pub raw_text: String,
    pub normalized: String,
    pub confidence: f64,
    pub attrs: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Org,
    Person,
    Location,
    Date,
    Money,
    Percentage,
    Amount,
    Period,
    Unit,
}

#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub raw_text: String,
    pub normalized: String,
    pub confidence: f64,
    pub attrs: serde_json::Value,
}
