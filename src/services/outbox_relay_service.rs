use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::config::OutboxConfig;
use crate::db;
use crate::errors::AppError;
use crate::external::BrokerClient;
use crate::models::{BrokerEnvelope, OutboxStatus};

#[derive(Debug, Default)]
pub struct RelayResult {
    pub sent: u32,
    pub failed: u32,
    pub dead_lettered: u32,
}

/// One pass of the outbox relay loop (spec.md §4.11): claim a batch of due
/// `Pending` rows, publish each to the broker, and update its disposition.
/// Runs continuously from its own task in `main.rs`, not as a cron job,
/// since it must poll at sub-minute granularity.
pub async fn relay_once(
    pool: &PgPool,
    broker: &dyn BrokerClient,
    cfg: &OutboxConfig,
) -> Result<RelayResult, AppError> {
    let batch = db::outbox_queries::claim_due_batch(pool, cfg.batch_size).await?;
    let mut result = RelayResult::default();

    for row in batch {
        let envelope = BrokerEnvelope { topic: row.topic.clone(), occurred_at: row.created_at, payload: row.payload.clone() };

        match broker.publish(&envelope).await {
            Ok(()) => {
                db::outbox_queries::mark_sent(pool, row.id).await?;
                result.sent += 1;
                info!(outbox_id = %row.id, topic = %row.topic, "outbox entry published");
            }
            Err(e) => {
                let retries = row.retries + 1;
                if retries >= cfg.max_retries {
                    db::outbox_queries::mark_dead_lettered(pool, row.id).await?;
                    result.dead_lettered += 1;
                    error!(outbox_id = %row.id, topic = %row.topic, error = %e, "outbox entry dead-lettered");
                } else {
                    let next_attempt = chrono::Utc::now()
                        + crate::services::retry::next_attempt_delay(cfg.base_retry_seconds, retries);
                    db::outbox_queries::schedule_retry(pool, row.id, retries, next_attempt).await?;
                    result.failed += 1;
                    warn!(outbox_id = %row.id, topic = %row.topic, retries, error = %e, "outbox publish failed, rescheduled");
                }
            }
        }
    }

    Ok(result)
}

/// Deletes `Sent` rows older than `keep_days` (spec.md §4.11 step 4).
pub async fn purge_old_sent(pool: &PgPool, cfg: &OutboxConfig) -> Result<u64, AppError> {
    let deleted = db::outbox_queries::purge_sent_older_than(pool, cfg.keep_days).await?;
    if deleted > 0 {
        info!(deleted, "purged old sent outbox rows");
    }
    Ok(deleted)
}

pub fn is_terminal(status: OutboxStatus) -> bool {
    matches!(status, OutboxStatus::Sent | OutboxStatus::DeadLettered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_sent_and_dead_lettered() {
        assert!(is_terminal(OutboxStatus::Sent));
        assert!(is_terminal(OutboxStatus::DeadLettered));
        assert!(!is_terminal(OutboxStatus::Pending));
        assert!(!is_terminal(OutboxStatus::Failed));
    }
}
