use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use newsceg_backend::config::Config;
use newsceg_backend::external::{
    BrokerClient, Extractor, FallbackExtractor, GraphStoreClient, HtmlAdapter, HttpBrokerClient,
    HttpPriceApiClient, HttpSecuritiesMasterClient, InMemoryGraphStore, MessageChannelAdapter,
    NullBrokerClient, NullPriceApiClient, NullSecuritiesMasterClient, PriceApiClient, SecuritiesMasterClient,
    SourceAdapter,
};
use newsceg_backend::models::SourceKind;
use newsceg_backend::services::alias_cache::AliasCache;
use newsceg_backend::services::ceg_engine::EventScoringLocks;
use newsceg_backend::state::AppState;
use newsceg_backend::{app, config, db, logging, services};

/// Exit codes, spec.md §6.8: 1 bad configuration, 2 storage unreachable,
/// 3 broker unreachable at startup.
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_STORAGE_UNREACHABLE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(e) = logging::init_logging(logging::LoggingConfig::from_env()) {
        eprintln!("logging initialization failed: {e}");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to connect to storage");
            return ExitCode::from(EXIT_STORAGE_UNREACHABLE);
        }
    };

    let alias_cache = match AliasCache::load(&pool).await {
        Ok(cache) => cache,
        Err(e) => {
            error!(error = %e, "failed to load alias cache");
            return ExitCode::from(EXIT_STORAGE_UNREACHABLE);
        }
    };

    if config.broker_url.is_none() {
        warn!("BROKER_URL not set, outbox relay will use the no-op broker stand-in");
    }

    let broker: Arc<dyn BrokerClient> = match &config.broker_url {
        Some(url) => Arc::new(HttpBrokerClient::new(url.clone())),
        None => Arc::new(NullBrokerClient),
    };
    let securities_master: Arc<dyn SecuritiesMasterClient> = match &config.securities_master_url {
        Some(url) => Arc::new(HttpSecuritiesMasterClient::new(url.clone())),
        None => Arc::new(NullSecuritiesMasterClient),
    };
    let price_api: Arc<dyn PriceApiClient> = match &config.price_api_url {
        Some(url) => Arc::new(HttpPriceApiClient::new(url.clone())),
        None => Arc::new(NullPriceApiClient),
    };
    let graph_store: Arc<dyn GraphStoreClient> = Arc::new(InMemoryGraphStore::new());
    let extractor: Arc<dyn Extractor> = Arc::new(FallbackExtractor);

    let config = Arc::new(config);

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        extractor,
        securities_master,
        price_api,
        graph_store,
        broker: broker.clone(),
        alias_cache,
        scoring_locks: EventScoringLocks::new(),
    };

    let cancel = CancellationToken::new();
    let shared_pool = Arc::new(pool);
    let mut tasks = Vec::new();

    let enabled_sources = match db::source_queries::list_enabled(&state.pool).await {
        Ok(sources) => sources,
        Err(e) => {
            error!(error = %e, "failed to load enabled sources");
            return ExitCode::from(EXIT_STORAGE_UNREACHABLE);
        }
    };

    let message_channel_adapter: Arc<dyn SourceAdapter> = Arc::new(MessageChannelAdapter::new());
    let html_adapter: Arc<dyn SourceAdapter> = Arc::new(HtmlAdapter::new());

    for source in enabled_sources {
        let adapter = match source.kind {
            SourceKind::MessageChannel => message_channel_adapter.clone(),
            SourceKind::Html => html_adapter.clone(),
        };

        let entry = config.sources.iter().find(|s| s.code == source.code);
        let poll_interval = Duration::from_secs(entry.map(|e| e.poll_interval_secs).unwrap_or(60));
        let backfill_days = entry.map(|e| e.backfill_days).unwrap_or(7);
        let needs_backfill = !source.backfill_completed;

        if needs_backfill {
            let pool = shared_pool.clone();
            let adapter = adapter.clone();
            let source = source.clone();
            let config = config.clone();
            tasks.push(tokio::spawn(async move {
                services::source_poller_service::run_backfill(pool, adapter, source, backfill_days, config).await;
            }));
        }

        let pool = shared_pool.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            services::source_poller_service::run_source_loop(pool, adapter, source, poll_interval, config, cancel)
                .await;
        }));
    }

    for worker_id in 0..config.enrichment.workers {
        let state = state.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            run_enrichment_worker(worker_id, state, cancel).await;
        }));
    }

    {
        let pool = state.pool.clone();
        let broker = state.broker.clone();
        let outbox_config = config.outbox.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            run_outbox_relay(pool, broker, outbox_config, cancel).await;
        }));
    }

    let app = app::create_app(state);
    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.bind_addr, "failed to bind HTTP listener");
            cancel.cancel();
            return ExitCode::from(EXIT_STORAGE_UNREACHABLE);
        }
    };

    info!(addr = %config.bind_addr, "newsceg backend running");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    for task in tasks {
        task.abort();
    }

    match serve_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "HTTP server exited with error");
            ExitCode::from(EXIT_STORAGE_UNREACHABLE)
        }
    }
}

/// One worker from the enrichment pool (spec.md §4.3/§5 "Worker pool
/// claims"): loops claiming a batch of unenriched News and running the
/// pipeline on each, backing off when the queue is empty.
async fn run_enrichment_worker(worker_id: usize, state: AppState, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        let batch = match db::news_queries::claim_unenriched_batch(&state.pool, 10).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(worker_id, error = %e, "failed to claim unenriched batch");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(state.config.enrichment.backoff_poll_secs)) => {}
                    _ = cancel.cancelled() => return,
                }
                continue;
            }
        };

        if batch.is_empty() {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                _ = cancel.cancelled() => return,
            }
            continue;
        }

        for news in batch {
            let ctx = services::enrichment_service::EnrichmentContext {
                pool: &state.pool,
                extractor: state.extractor.as_ref(),
                securities_master: state.securities_master.as_ref(),
                price_api: state.price_api.as_ref(),
                graph_store: state.graph_store.as_ref(),
                alias_cache: &state.alias_cache,
                scoring_locks: &state.scoring_locks,
                config: &state.config,
            };

            if let Err(e) = services::enrichment_service::enrich_news(&ctx, news.id).await {
                error!(worker_id, news_id = %news.id, error = %e, "enrichment failed");
            }
        }
    }
}

/// Outbox relay task (spec.md §4.11): continuous claim/publish loop plus a
/// periodic sweep of old `Sent` rows.
async fn run_outbox_relay(
    pool: sqlx::PgPool,
    broker: Arc<dyn BrokerClient>,
    cfg: config::OutboxConfig,
    cancel: CancellationToken,
) {
    let mut since_purge = Duration::ZERO;
    let purge_interval = Duration::from_secs(3600);
    let tick = Duration::from_secs(2);

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match services::outbox_relay_service::relay_once(&pool, broker.as_ref(), &cfg).await {
            Ok(result) => {
                if result.sent > 0 || result.dead_lettered > 0 {
                    info!(sent = result.sent, failed = result.failed, dead_lettered = result.dead_lettered, "outbox relay pass");
                }
            }
            Err(e) => error!(error = %e, "outbox relay pass failed"),
        }

        since_purge += tick;
        if since_purge >= purge_interval {
            since_purge = Duration::ZERO;
            if let Err(e) = services::outbox_relay_service::purge_old_sent(&pool, &cfg).await {
                error!(error = %e, "outbox purge failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(tick) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight work");
}
