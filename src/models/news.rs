use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::ContentHash;
use super::topic::{NewsSubtype, NewsType};

/// A durably stored news item. Immutable after first write except for
/// `enrichment_status`, `is_ad`/`ad_score`/`ad_reasons`, and the
/// classifier-assigned `sector_code`/`country_code`/`news_type`/
/// `news_subtype` (written once, at the end of enrichment step 4 — spec.md
/// §4.6; stored on News itself rather than a separate table since they are
/// 1:1 per item, unlike the up-to-3-per-item `topics`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct News {
    pub id: Uuid,
    pub source_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub text: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    pub url: Option<String>,
    pub lang: String,
    pub content_hash: ContentHash,
    pub dedup_status: DedupStatus,
    pub is_ad: bool,
    pub ad_score: f64,
    pub ad_reasons: Vec<String>,
    pub enrichment_status: EnrichmentStatus,
    pub sector_code: Option<String>,
    pub country_code: Option<String>,
    pub news_type: Option<NewsType>,
    pub news_subtype: Option<NewsSubtype>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DedupStatus {
    Winner,
    DuplicateOnHash,
    DuplicateOnExternalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

/// The uniform record every source adapter emits, before dedup/persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNews {
    pub source_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub text: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: Option<String>,
    pub media_refs: Vec<RawMediaRef>,
    pub raw_meta: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMediaRef {
    pub url: String,
    pub kind: String,
}

impl RawNews {
    /// Content hash is computed over normalized title+text, independent of
    /// source/external id, so the same article re-published by two sources
    /// dedups to one row (invariant 1, spec.md §8).
    pub fn content_hash(&self) -> ContentHash {
        let normalized = normalize_for_hash(&self.title, &self.text);
        ContentHash::of(normalized.as_bytes())
    }
}

fn normalize_for_hash(title: &str, text: &str) -> String {
    let fold = |s: &str| -> String {
        s.chars()
            .flat_map(|c| c.to_lowercase())
            .filter(|c| !c.is_whitespace())
            .collect()
    };
    format!("{}\u{0}{}", fold(title), fold(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateOnHash,
    DuplicateOnExternalId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, text: &str, source_id: Uuid, external_id: &str) -> RawNews {
        RawNews {
            source_id,
            external_id: external_id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            summary: None,
            published_at: Utc::now(),
            url: None,
            media_refs: vec![],
            raw_meta: serde_json::json!({}),
        }
    }

    #[test]
    fn identical_articles_from_different_sources_hash_equal() {
        let a = sample("ЦБ повысил ставку", "Банк России повысил ключевую ставку до 16%", Uuid::new_v4(), "a-1");
        let b = sample("цб повысил ставку", "банк россии повысил ключевую ставку до 16%", Uuid::new_v4(), "b-7");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn different_text_hashes_differ() {
        let a = sample("Заголовок", "Текст один", Uuid::new_v4(), "a-1");
        let b = sample("Заголовок", "Текст два", Uuid::new_v4(), "a-2");
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
