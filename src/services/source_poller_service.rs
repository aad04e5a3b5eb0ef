use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::errors::AppError;
use crate::external::{self, AdapterError, SourceAdapter};
use crate::models::{InsertOutcome, Source};
use crate::services::antispam_service;

/// One cooperative polling task per enabled Source (spec.md §5 "Scheduling").
/// Cursor discipline, backoff, and the unenriched-backlog back-pressure
/// check all live here, mirroring the teacher's one-task-per-job shape in
/// `JobSchedulerService` but as a hand-rolled loop since polling runs at a
/// per-source cadence rather than a shared cron schedule.
pub async fn run_source_loop(
    pool: Arc<PgPool>,
    adapter: Arc<dyn SourceAdapter>,
    mut source: Source,
    poll_interval: Duration,
    config: Arc<Config>,
    cancel: CancellationToken,
) {
    let mut channel_failures = 0u32;

    loop {
        if cancel.is_cancelled() {
            info!(source_code = %source.code, "source poller cancelled, exiting cleanly");
            return;
        }

        if let Err(e) = wait_for_backlog_capacity(&pool, &config, &cancel).await {
            warn!(source_code = %source.code, error = %e, "backlog capacity check failed");
        }

        match adapter.poll(&source, source.last_external_id.as_deref()).await {
            Ok(outcome) => {
                channel_failures = 0;
                process_poll_outcome(&pool, &config, &mut source, outcome).await;
            }
            Err(AdapterError::NotFoundOrPermission) => {
                channel_failures += 1;
                error!(source_code = %source.code, channel_failures, "source unhealthy");
                if channel_failures >= crate::external::MAX_CHANNEL_RETRIES {
                    db::source_queries::mark_unhealthy(&pool, source.id).await.ok();
                    warn!(source_code = %source.code, "max retries exhausted, pausing source");
                    return;
                }
            }
            Err(AdapterError::Transient(msg)) => {
                warn!(source_code = %source.code, error = %msg, "transient polling error");
                db::source_queries::increment_error_count(&pool, source.id).await.ok();
                let backoff = crate::external::backoff_delay(channel_failures);
                channel_failures += 1;
                tokio::select! {
                    _ = sleep(backoff) => {}
                    _ = cancel.cancelled() => return,
                }
                continue;
            }
            Err(AdapterError::MalformedItem(msg)) => {
                warn!(source_code = %source.code, error = %msg, "skipped malformed item");
            }
        }

        tokio::select! {
            _ = sleep(poll_interval) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

async fn wait_for_backlog_capacity(pool: &PgPool, config: &Config, cancel: &CancellationToken) -> Result<(), AppError> {
    loop {
        let backlog = db::news_queries::count_unenriched(pool).await?;
        if backlog < config.enrichment.max_backlog {
            return Ok(());
        }
        warn!(backlog, max = config.enrichment.max_backlog, "unenriched backlog over limit, backing off");
        tokio::select! {
            _ = sleep(Duration::from_secs(config.enrichment.backoff_poll_secs)) => {}
            _ = cancel.cancelled() => return Ok(()),
        }
    }
}

async fn process_poll_outcome(
    pool: &PgPool,
    config: &Config,
    source: &mut Source,
    outcome: crate::external::PollOutcome,
) {
    let mut items = outcome.items;
    items.sort_by(|a, b| external::commit_key(a).cmp(&external::commit_key(b)));

    for raw in items {
        if let Err(e) = ingest_one(pool, config, source, &raw).await {
            error!(source_code = %source.code, external_id = %raw.external_id, error = %e, "failed to ingest item");
        }
    }

    if let Some(new_cursor) = outcome.new_cursor {
        if db::source_queries::advance_cursor(pool, source.id, &new_cursor).await.is_ok() {
            source.last_external_id = Some(new_cursor);
        }
    }
}

async fn ingest_one(
    pool: &PgPool,
    config: &Config,
    source: &Source,
    raw: &crate::models::RawNews,
) -> Result<(), AppError> {
    let whitelisted: Vec<String> = source
        .config
        .get("whitelisted_domains")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let antispam = antispam_service::score(raw, &whitelisted, source.trust_level, &config.antispam);

    let outcome = db::news_queries::try_insert(pool, raw, &antispam).await?;

    match outcome {
        InsertOutcome::Inserted => {
            info!(external_id = %raw.external_id, is_ad = antispam.is_ad, "news ingested");
        }
        InsertOutcome::DuplicateOnHash | InsertOutcome::DuplicateOnExternalId => {
            info!(external_id = %raw.external_id, outcome = ?outcome, "duplicate news skipped");
        }
    }

    Ok(())
}

/// Runs historical backfill for one source up to `horizon_days`, as a
/// one-shot task that runs concurrently with live polling (spec.md §4.1
/// "Cursor discipline").
pub async fn run_backfill(
    pool: Arc<PgPool>,
    adapter: Arc<dyn SourceAdapter>,
    source: Source,
    horizon_days: u32,
    config: Arc<Config>,
) {
    use futures::StreamExt;

    let mut stream = adapter.backfill(&source, horizon_days);
    let mut count = 0u32;

    while let Some(item) = stream.next().await {
        match item {
            Ok(raw) => {
                if ingest_one(&pool, &config, &source, &raw).await.is_ok() {
                    count += 1;
                }
            }
            Err(e) => warn!(source_code = %source.code, error = %e, "backfill item error"),
        }
    }

    if let Err(e) = db::source_queries::mark_backfill_completed(&pool, source.id).await {
        error!(source_code = %source.code, error = %e, "failed to mark backfill completed");
        return;
    }

    info!(source_code = %source.code, count, "backfill completed");
}
