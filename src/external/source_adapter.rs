use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::{RawNews, Source};

/// Per-source adapter contract (spec.md §4.1). One instance is registered
/// per `Source.kind` in a `HashMap<String, Arc<dyn SourceAdapter>>` keyed by
/// source code — the "strategy per source" translation from spec.md §9.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Poll for new items since `cursor` (the source's `last_external_id`),
    /// best-effort ordered by `published_at`.
    async fn poll(
        &self,
        source: &Source,
        cursor: Option<&str>,
    ) -> Result<PollOutcome, AdapterError>;

    /// Stream historical items back to `horizon` days, capped at 365.
    fn backfill(
        &self,
        source: &Source,
        horizon_days: u32,
    ) -> BoxStream<'static, Result<RawNews, AdapterError>>;
}

#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub items: Vec<RawNews>,
    pub new_cursor: Option<String>,
}

/// Failure classes from spec.md §4.1.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("source not found or permission denied")]
    NotFoundOrPermission,
    #[error("rate limited or transient HTTP error: {0}")]
    Transient(String),
    #[error("malformed item, skipped: {0}")]
    MalformedItem(String),
}

impl AdapterError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }
}

/// Exponential backoff with a 15-minute cap, per spec.md §4.1.
pub fn backoff_delay(attempt: u32) -> std::time::Duration {
    let base_secs = 2_u64.saturating_pow(attempt.min(20));
    std::time::Duration::from_secs(base_secs.min(15 * 60))
}

pub const MAX_CHANNEL_RETRIES: u32 = 3;
pub const MAX_BACKFILL_HORIZON_DAYS: u32 = 365;

pub fn clamp_horizon(horizon_days: u32) -> u32 {
    horizon_days.min(MAX_BACKFILL_HORIZON_DAYS)
}

/// Monotonic commit key within a single adapter thread (spec.md §5 "Per-source"
/// ordering): `(published_at, external_id)`.
pub fn commit_key(item: &RawNews) -> (DateTime<Utc>, &str) {
    (item.published_at, item.external_id.as_str())
}
