use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Co-written with the originating domain row in one atomic unit, relayed to
/// the broker by the Outbox Relay (C13).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxRow {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub retries: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
    DeadLettered,
}

/// A row to co-write with its originating unit of work, not yet assigned an id.
#[derive(Debug, Clone)]
pub struct NewOutboxEntry {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl NewOutboxEntry {
    pub fn news_created(news_id: Uuid) -> Self {
        Self {
            topic: "news.created".to_string(),
            payload: serde_json::json!({ "news_id": news_id }),
        }
    }

    pub fn news_enriched(news_id: Uuid) -> Self {
        Self {
            topic: "news.enriched".to_string(),
            payload: serde_json::json!({ "news_id": news_id }),
        }
    }

    pub fn event_created(event_id: Uuid, news_id: Uuid) -> Self {
        Self {
            topic: "event.created".to_string(),
            payload: serde_json::json!({ "event_id": event_id, "news_id": news_id }),
        }
    }

    pub fn event_caused(cause_event_id: Uuid, effect_event_id: Uuid) -> Self {
        Self {
            topic: "event.caused".to_string(),
            payload: serde_json::json!({
                "cause_event_id": cause_event_id,
                "effect_event_id": effect_event_id,
            }),
        }
    }

    pub fn event_impacts(event_id: Uuid, ticker: &str) -> Self {
        Self {
            topic: "event.impacts".to_string(),
            payload: serde_json::json!({ "event_id": event_id, "ticker": ticker }),
        }
    }
}

/// The JSON envelope published to the broker (spec.md §6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerEnvelope {
    #[serde(rename = "type")]
    pub topic: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}
