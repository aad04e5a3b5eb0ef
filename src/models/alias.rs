use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalised organisation-name string resolving to an Issuer. Learned
/// aliases are additive and persisted; curated entries may be tombstoned by
/// an operator but never overwritten by the linker.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alias {
    pub normalized_string: String,
    pub issuer_id: Uuid,
    pub origin: AliasOrigin,
    pub confidence: f64,
    pub tombstoned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AliasOrigin {
    Curated,
    Learned,
}
