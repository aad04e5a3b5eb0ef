use std::sync::Arc;

use dashmap::DashMap;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{Alias, AliasOrigin};

#[derive(Debug, Clone)]
struct AliasEntry {
    issuer_id: Uuid,
    origin: AliasOrigin,
    confidence: f64,
}

/// Read-mostly alias cache for the Linker (C7), spec.md §5 "Shared
/// resources": one owning actor persists writes, everyone else reads the
/// shared map. Mirrors the teacher's `FailureCache` shape (`DashMap` behind
/// a cheaply-`Clone`-able handle) but for a grow-only, persisted dataset
/// instead of a self-expiring one.
#[derive(Clone)]
pub struct AliasCache {
    entries: Arc<DashMap<String, AliasEntry>>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self { entries: Arc::new(DashMap::new()) }
    }

    /// Loads every non-tombstoned alias from the relational store. Called
    /// once in `main.rs` at startup.
    pub async fn load(pool: &PgPool) -> Result<Self, AppError> {
        let cache = Self::new();
        let aliases = db::alias_queries::fetch_all_active(pool).await?;
        for alias in aliases {
            cache.insert_local(&alias);
        }
        info!(count = cache.entries.len(), "alias cache loaded");
        Ok(cache)
    }

    fn insert_local(&self, alias: &Alias) {
        self.entries.insert(
            alias.normalized_string.clone(),
            AliasEntry { issuer_id: alias.issuer_id, origin: alias.origin, confidence: alias.confidence },
        );
    }

    /// Curated entries are preferred over learned ones on a lookup
    /// collision, matching spec.md §4.5 step 2 ("curated first, then
    /// learned"); since both share one key there is only ever one entry per
    /// normalized string, so this is a plain map lookup.
    pub fn lookup(&self, normalized: &str) -> Option<(Uuid, AliasOrigin, f64)> {
        self.entries.get(normalized).map(|e| (e.issuer_id, e.origin, e.confidence))
    }

    /// Persists and installs a new learned alias (spec.md §4.5 step 4).
    /// Learned aliases are additive: a pre-existing curated entry for the
    /// same normalized string is never overwritten.
    pub async fn learn(
        &self,
        pool: &PgPool,
        normalized: &str,
        issuer_id: Uuid,
        confidence: f64,
    ) -> Result<(), AppError> {
        if let Some(existing) = self.entries.get(normalized) {
            if existing.origin == AliasOrigin::Curated {
                return Ok(());
            }
        }

        let alias = db::alias_queries::insert_learned(pool, normalized, issuer_id, confidence).await?;
        self.insert_local(&alias);
        Ok(())
    }
}

impl Default for AliasCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_misses_on_empty_cache() {
        let cache = AliasCache::new();
        assert!(cache.lookup("пао лукойл").is_none());
    }
}
