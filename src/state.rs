use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::external::{BrokerClient, Extractor, GraphStoreClient, PriceApiClient, SecuritiesMasterClient};
use crate::services::alias_cache::AliasCache;
use crate::services::ceg_engine::EventScoringLocks;

/// Shared handle passed to every HTTP route and background task, built once
/// in `main.rs` (spec.md §9 "Global singletons ... explicit dependency
/// objects constructed once at startup and passed by reference"), mirroring
/// the teacher's `AppState { pool, price_provider }` shape generalized to
/// this engine's full external-collaborator set (§6).
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub extractor: Arc<dyn Extractor>,
    pub securities_master: Arc<dyn SecuritiesMasterClient>,
    pub price_api: Arc<dyn PriceApiClient>,
    pub graph_store: Arc<dyn GraphStoreClient>,
    pub broker: Arc<dyn BrokerClient>,
    pub alias_cache: AliasCache,
    pub scoring_locks: EventScoringLocks,
}
