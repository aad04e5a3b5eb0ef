use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::errors::AppError;
use crate::external::{Extractor, ExtractorError, GraphStoreClient, PriceApiClient, SecuritiesMasterClient};
use crate::models::{CausalEdge, EnrichmentStatus, EntityKind, LinkMethod, NewEntity, NewOutboxEntry};
use crate::services::alias_cache::AliasCache;
use crate::services::ceg_engine::{EventScoringLocks, EventWithText};
use crate::services::graph_writer_service::GraphWriter;
use crate::services::{ceg_engine, classifier_service, event_extractor_service, event_study_service, linker_service};

/// Everything the enrichment pipeline needs to process one News item,
/// grouped the way the teacher groups per-request collaborators in
/// `AppState` (pool, price_provider, …) — passed by reference since the
/// pipeline never outlives one worker-pool task.
pub struct EnrichmentContext<'a> {
    pub pool: &'a PgPool,
    pub extractor: &'a dyn Extractor,
    pub securities_master: &'a dyn SecuritiesMasterClient,
    pub price_api: &'a dyn PriceApiClient,
    pub graph_store: &'a dyn GraphStoreClient,
    pub alias_cache: &'a AliasCache,
    pub scoring_locks: &'a EventScoringLocks,
    pub config: &'a Config,
}

/// Runs the full per-news orchestration (spec.md §4.4, steps 1-7). Returns
/// `Ok(())` once the News is durably marked enriched (or Failed, after
/// exhausting the extractor retry budget — that is still a successful run
/// of this function, matching spec.md §7's "DownstreamFailure... degrade").
pub async fn enrich_news(ctx: &EnrichmentContext<'_>, news_id: Uuid) -> Result<(), AppError> {
    let news = db::news_queries::find_by_id(ctx.pool, news_id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("news {news_id}")))?;

    if news.is_ad {
        db::news_queries::mark_enriched(ctx.pool, news_id, None, EnrichmentStatus::Done).await?;
        return Ok(());
    }

    let extraction = match run_extractor_with_retry(ctx, &news).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(news_id = %news_id, error = %e, "extractor budget exhausted, marking news Failed");
            db::news_queries::mark_enriched(ctx.pool, news_id, None, EnrichmentStatus::Failed).await?;
            db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::news_enriched(news_id)).await?;
            return Ok(());
        }
    };

    if extraction.is_advertisement {
        db::news_queries::mark_ad(ctx.pool, news_id, true, extraction.confidence, vec!["extractor_flagged".to_string()])
            .await?;
        db::news_queries::mark_enriched(ctx.pool, news_id, None, EnrichmentStatus::Done).await?;
        return Ok(());
    }

    let writer = GraphWriter::new(ctx.graph_store);

    let mut entities = Vec::new();
    for company in &extraction.companies {
        entities.push(NewEntity {
            kind: EntityKind::Org,
            raw_text: company.raw_text.clone(),
            normalized: linker_service::normalize(&company.raw_text),
            confidence: company.confidence,
            attrs: serde_json::json!({}),
        });
    }
    for person in &extraction.people {
        entities.push(NewEntity {
            kind: EntityKind::Person,
            raw_text: person.clone(),
            normalized: person.to_lowercase(),
            confidence: extraction.confidence,
            attrs: serde_json::json!({}),
        });
    }
    db::entity_queries::insert_many(ctx.pool, news_id, &entities).await?;

    let mut linked_companies_with_ticker = Vec::new();
    for company in &extraction.companies {
        if let Some(link) = linker_service::link(ctx.pool, ctx.alias_cache, ctx.securities_master, &company.raw_text).await? {
            let issuer = db::issuer_queries::find_by_id(ctx.pool, link.issuer_id).await?;
            let Some(issuer) = issuer else { continue };
            let is_primary = news.title.contains(&company.raw_text);
            let linked = db::linked_company_queries::insert(
                ctx.pool,
                news_id,
                link.issuer_id,
                link.method,
                link.score,
                is_primary,
            )
            .await?;
            linked_companies_with_ticker.push((linked, issuer.ticker.clone()));

            if matches!(link.method, LinkMethod::Fuzzy | LinkMethod::AutoLearned) {
                writer.write_issuer(&issuer).await.ok();
            }
        }
    }

    let linked_issuer_sector = if let Some((linked, _)) = linked_companies_with_ticker.first() {
        db::issuer_queries::find_by_id(ctx.pool, linked.issuer_id).await?.and_then(|i| i.sector_id)
    } else {
        None
    };

    let classification = classifier_service::classify(
        news_id,
        &news.title,
        &news.text,
        &news.lang,
        &extraction,
        linked_issuer_sector.as_deref(),
        linked_companies_with_ticker.len(),
    );
    db::topic_queries::replace_topics(ctx.pool, news_id, &classification).await?;

    let source = db::source_queries::find_by_id(ctx.pool, news.source_id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound(format!("source {}", news.source_id)))?;

    let new_events = event_extractor_service::extract_events(
        &news.title,
        &news.text,
        news.published_at,
        &extraction,
        &linked_companies_with_ticker,
        source.trust_level,
        ctx.config.enrichment.max_events_per_news,
    );

    let mut persisted_events = Vec::new();
    for new_event in new_events {
        let event = db::event_queries::insert(ctx.pool, news_id, new_event).await?;
        db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::event_created(event.id, news_id)).await?;
        persisted_events.push(event);
    }

    for event in &persisted_events {
        writer.write_event(event).await.ok();

        let lock = ctx.scoring_locks.lock_for(event.id);
        let _guard = lock.lock().await;

        run_ceg_for_event(ctx, event, &news.text).await?;

        if let Some(ticker) = event.attrs.first_ticker() {
            let outcome = event_study_service::analyse(
                ctx.price_api,
                ticker,
                event.id,
                event.ts,
                &ctx.config.event_study,
            )
            .await;
            if let event_study_service::EventStudyOutcome::Computed { edge, .. } = outcome {
                writer.write_impact_edge(&edge).await.ok();
                db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::event_impacts(event.id, ticker)).await?;
            }
        }
    }

    run_internal_ceg(ctx, &persisted_events, &news.text, &writer).await?;

    db::news_queries::mark_enriched(ctx.pool, news_id, news.summary.clone(), EnrichmentStatus::Done).await?;
    db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::news_enriched(news_id)).await?;

    info!(news_id = %news_id, event_count = persisted_events.len(), "news enriched");
    Ok(())
}

/// Internal linking: pairs within the same news, ordered by `ts` with ties
/// broken by extraction order — `persisted_events` is already in that order
/// (spec.md §4.8 step 2).
async fn run_internal_ceg(
    ctx: &EnrichmentContext<'_>,
    persisted_events: &[crate::models::Event],
    news_text: &str,
    writer: &GraphWriter<'_>,
) -> Result<(), AppError> {
    if persisted_events.len() < 2 {
        return Ok(());
    }

    let mut scored = Vec::new();
    for i in 0..persisted_events.len() {
        for j in (i + 1)..persisted_events.len() {
            let e_a = EventWithText { event: persisted_events[i].clone(), news_text: news_text.to_string() };
            let e_b = EventWithText { event: persisted_events[j].clone(), news_text: news_text.to_string() };
            scored.push(ceg_engine::score_pair(&e_a, &e_b, ctx.price_api, &ctx.config.ceg, &ctx.config.event_study).await);
        }
    }

    retire_stale_edges(ctx, writer, &scored).await?;

    let survivors = ceg_engine::select_surviving_edges(scored, ctx.config.ceg.min_confidence);
    for edge in survivors {
        let edge = ceg_engine::maybe_confirm(edge);
        writer.write_causal_edge(&edge).await.ok();
        db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::event_caused(edge.cause_event_id, edge.effect_event_id)).await?;
    }

    Ok(())
}

/// Edge-maintenance pass (spec.md §4.8 step 4, invariant 3: a CAUSES edge
/// whose `conf_total` falls below θ_link on recompute is removed, never left
/// stale). Any pair just re-scored that already has a persisted edge for the
/// same `(cause, effect)` key gets that edge deleted once it no longer clears
/// `min_confidence` — covers retries and reprocessing of a pair scored
/// earlier under different price/text evidence.
async fn retire_stale_edges(
    ctx: &EnrichmentContext<'_>,
    writer: &GraphWriter<'_>,
    scored: &[CausalEdge],
) -> Result<(), AppError> {
    let min_confidence = ctx.config.ceg.min_confidence;
    let weak: Vec<&CausalEdge> = scored.iter().filter(|e| e.conf_total < min_confidence).collect();
    if weak.is_empty() {
        return Ok(());
    }

    let existing = ctx
        .graph_store
        .causal_edges()
        .await
        .map_err(|e| AppError::DownstreamFailure(e.to_string()))?;
    let existing_keys: std::collections::HashSet<(Uuid, Uuid)> =
        existing.into_iter().map(|e| (e.cause_event_id, e.effect_event_id)).collect();

    for edge in weak {
        let key = (edge.cause_event_id, edge.effect_event_id);
        if existing_keys.contains(&key) {
            writer.remove_causal_edge(edge.cause_event_id, edge.effect_event_id).await.ok();
        }
    }
    Ok(())
}

async fn run_extractor_with_retry(
    ctx: &EnrichmentContext<'_>,
    news: &crate::models::News,
) -> Result<crate::external::Extraction, ExtractorError> {
    crate::services::retry::with_backoff(
        "extractor",
        ctx.config.enrichment.max_retries + 1,
        std::time::Duration::from_millis(200),
        || ctx.extractor.extract(&news.text, &news.title, news.published_at, &news.lang),
    )
    .await
}

/// Forward + internal + retroactive linking for one newly-persisted event
/// against its contemporaries and history (spec.md §4.8 steps 1-4).
async fn run_ceg_for_event(
    ctx: &EnrichmentContext<'_>,
    e_new: &crate::models::Event,
    news_text: &str,
) -> Result<(), AppError> {
    let past = db::event_queries::find_in_window(
        ctx.pool,
        e_new.ts - chrono::Duration::days(ctx.config.ceg.lookback_days),
        e_new.ts,
    )
    .await?;
    let past_with_text = attach_text(ctx.pool, past).await?;

    let forward = ceg_engine::forward_candidates(e_new, &past_with_text, ctx.config.ceg.lookback_days);
    let e_new_with_text = EventWithText { event: e_new.clone(), news_text: news_text.to_string() };

    let mut scored = Vec::new();
    for candidate in forward {
        let edge = ceg_engine::score_pair(candidate, &e_new_with_text, ctx.price_api, &ctx.config.ceg, &ctx.config.event_study).await;
        scored.push(edge);
    }

    let future = db::event_queries::find_in_window(
        ctx.pool,
        e_new.ts,
        e_new.ts + chrono::Duration::days(ctx.config.ceg.retro_window_days),
    )
    .await?;
    let future_with_text = attach_text(ctx.pool, future).await?;
    let retro = ceg_engine::retro_candidates(e_new, &future_with_text, ctx.config.ceg.retro_window_days);
    for candidate in retro {
        let edge = ceg_engine::score_pair(&e_new_with_text, candidate, ctx.price_api, &ctx.config.ceg, &ctx.config.event_study).await;
        scored.push(ceg_engine::mark_retroactive(edge));
    }

    let writer = GraphWriter::new(ctx.graph_store);
    retire_stale_edges(ctx, &writer, &scored).await?;

    let survivors = ceg_engine::select_surviving_edges(scored, ctx.config.ceg.min_confidence);
    for edge in survivors {
        let edge = ceg_engine::maybe_confirm(edge);
        writer.write_causal_edge(&edge).await.ok();
        db::outbox_queries::insert(ctx.pool, &NewOutboxEntry::event_caused(edge.cause_event_id, edge.effect_event_id)).await?;
    }

    Ok(())
}

async fn attach_text(pool: &PgPool, events: Vec<crate::models::Event>) -> Result<Vec<EventWithText>, AppError> {
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        let text = db::news_queries::find_by_id(pool, event.news_id)
            .await?
            .map(|n| n.text)
            .unwrap_or_default();
        out.push(EventWithText { event, news_text: text });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_extraction_produces_no_entities() {
        let extraction = crate::external::Extraction::default();
        assert!(extraction.companies.is_empty());
        assert!(extraction.people.is_empty());
    }
}
