use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured news origin: a messaging channel or a web site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Source {
    pub id: Uuid,
    pub code: String,
    pub kind: SourceKind,
    pub display_name: String,
    pub base_locator: String,
    pub trust_level: i16,
    pub enabled: bool,
    pub config: serde_json::Value,
    pub last_external_id: Option<String>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub error_count: i32,
    pub backfill_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    MessageChannel,
    Html,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MessageChannel => "message_channel",
            SourceKind::Html => "html",
        }
    }
}

/// A single configured source entry as read from the `sources.yml`-style
/// configuration surface (spec.md §6.7).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfigEntry {
    pub code: String,
    pub kind: SourceKind,
    pub locator: String,
    pub display_name: Option<String>,
    pub trust_level: i16,
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub backfill_days: u32,
    #[serde(default)]
    pub config: serde_json::Value,
}
