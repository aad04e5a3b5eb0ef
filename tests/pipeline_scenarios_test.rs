//! Pipeline scenarios (spec.md §8) exercised against pure business logic and
//! fakes — no live Postgres connection is required for any of these.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use newsceg_backend::config::{AntispamConfig, AntispamRuleConfig, AntispamRuleKind};
use newsceg_backend::external::{BrokerClient, BrokerError};
use newsceg_backend::models::{BrokerEnvelope, NewOutboxEntry, OutboxStatus, RawMediaRef, RawNews};
use newsceg_backend::services::antispam_service;
use newsceg_backend::services::linker_service::{match_score, normalize, pick_best_match, AUTO_LEARN_THRESHOLD};
use newsceg_backend::services::outbox_relay_service::is_terminal;
use newsceg_backend::services::retry::next_attempt_delay;

fn raw_news(title: &str, text: &str, url: Option<&str>, media_refs: Vec<RawMediaRef>) -> RawNews {
    RawNews {
        source_id: Uuid::new_v4(),
        external_id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        text: text.to_string(),
        summary: None,
        published_at: Utc::now(),
        url: url.map(|u| u.to_string()),
        media_refs,
        raw_meta: serde_json::json!({}),
    }
}

fn promo_antispam_cfg() -> AntispamConfig {
    AntispamConfig {
        threshold_default: 5.0,
        threshold_trusted: 8.0,
        trusted_level: 7,
        rules: vec![
            AntispamRuleConfig {
                id: "forward_indicator".to_string(),
                weight: 3.0,
                kind: AntispamRuleKind::ForwardIndicator,
            },
            AntispamRuleConfig {
                id: "link_count".to_string(),
                weight: 4.0,
                kind: AntispamRuleKind::LinkCount { min_links: 2 },
            },
        ],
    }
}

/// S3: a forwarded message stuffed with tracked links should clear the
/// default antispam threshold and be flagged `is_ad`, while an ordinary
/// single-source news item with no links should not.
#[test]
fn s3_ad_filtering_flags_forwarded_link_farm_not_plain_news() {
    let cfg = promo_antispam_cfg();

    let spam = raw_news(
        "Переслано из канала",
        "Подробнее тут https://bit.ly/aaa и тут https://bit.ly/bbb",
        None,
        vec![],
    );
    let spam_result = antispam_service::score(&spam, &[], 3, &cfg);
    assert!(spam_result.is_ad);
    assert!(spam_result.reasons.contains(&"forward_indicator".to_string()));
    assert!(spam_result.reasons.contains(&"link_count".to_string()));

    let plain = raw_news("Минфин опубликовал отчёт", "Минфин России опубликовал квартальный отчёт", None, vec![]);
    let plain_result = antispam_service::score(&plain, &[], 3, &cfg);
    assert!(!plain_result.is_ad);
    assert!(plain_result.reasons.is_empty());
}

/// S4: the same article published by two different channels under
/// different external ids must dedup to one content hash, while genuinely
/// distinct coverage of the same story keeps distinct hashes.
#[test]
fn s4_dedup_collapses_same_story_from_two_sources() {
    let channel_a = raw_news("ЦБ повысил ставку", "Банк России повысил ключевую ставку до 16% годовых", None, vec![]);
    let channel_b =
        raw_news("цб повысил ставку", "банк россии повысил ключевую ставку до 16% годовых", None, vec![]);
    assert_eq!(channel_a.content_hash(), channel_b.content_hash());
    assert_ne!(channel_a.source_id, channel_b.source_id);
    assert_ne!(channel_a.external_id, channel_b.external_id);

    let distinct_followup =
        raw_news("ЦБ повысил ставку", "Банк России повысил ключевую ставку до 17% годовых", None, vec![]);
    assert_ne!(channel_a.content_hash(), distinct_followup.content_hash());
}

/// S5: a securities-master hit for "ПАО Лукойл" should score above the
/// auto-learn threshold, and future mentions of the same name (in any
/// casing/legal-form variant) normalize to the same alias-cache key.
#[test]
fn s5_linker_auto_learns_lukoil_alias() {
    use newsceg_backend::external::SecurityMatch;

    let normalized = normalize("ПАО Лукойл");
    assert_eq!(normalized, "лукойл");
    assert_eq!(normalize("лукойл"), normalized, "a bare mention normalizes to the same cache key");
    assert_eq!(normalize("ОАО \"ЛУКОЙЛ\""), normalized, "legal-form variants collapse to the same key");

    let candidates = vec![
        SecurityMatch {
            secid: "LKOH".to_string(),
            isin: Some("RU0009024277".to_string()),
            shortname: "Лукойл".to_string(),
            name: "Лукойл".to_string(),
            is_traded: true,
            market: "equity".to_string(),
            board: Some("primary".to_string()),
        },
        SecurityMatch {
            secid: "LKOHB".to_string(),
            isin: None,
            shortname: "Лукойл преф".to_string(),
            name: "Лукойл преф".to_string(),
            is_traded: false,
            market: "bond".to_string(),
            board: None,
        },
    ];

    let (best, score) = pick_best_match(&normalized, &candidates).expect("at least one candidate");
    assert_eq!(best.secid, "LKOH");
    assert_eq!(score, match_score(&normalized, &candidates[0]));
    assert!(score >= AUTO_LEARN_THRESHOLD, "traded equity with ISIN should clear the auto-learn threshold");

    let weak_candidates = vec![SecurityMatch {
        secid: "XYZ".to_string(),
        isin: None,
        shortname: "Совершенно другая компания".to_string(),
        name: "Совершенно другая компания".to_string(),
        is_traded: false,
        market: "bond".to_string(),
        board: None,
    }];
    let (_, weak_score) = pick_best_match(&normalized, &weak_candidates).unwrap();
    assert!(weak_score < AUTO_LEARN_THRESHOLD, "an unrelated low-similarity hit should not auto-learn");
}

struct FlakyBroker {
    fail_times: std::sync::atomic::AtomicU32,
}

#[async_trait]
impl BrokerClient for FlakyBroker {
    async fn publish(&self, _envelope: &BrokerEnvelope) -> Result<(), BrokerError> {
        use std::sync::atomic::Ordering;
        if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
            Err(BrokerError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// S6: an outbox entry that fails to publish a couple of times should be
/// rescheduled with a doubling backoff and remain non-terminal, then reach
/// the terminal `Sent` state once the broker recovers; an entry that never
/// recovers exhausts its retries into `DeadLettered`, also terminal.
#[tokio::test]
async fn s6_outbox_retries_then_delivers_or_dead_letters() {
    let entry = NewOutboxEntry::event_caused(Uuid::new_v4(), Uuid::new_v4());
    let envelope = BrokerEnvelope { topic: entry.topic.clone(), occurred_at: Utc::now(), payload: entry.payload.clone() };

    let recovering_broker = FlakyBroker { fail_times: std::sync::atomic::AtomicU32::new(2) };
    let max_retries = 3i32;
    let base_retry_seconds = 60i64;

    let mut retries = 0i32;
    let mut status = OutboxStatus::Pending;
    let mut last_delay = chrono::Duration::zero();
    loop {
        match recovering_broker.publish(&envelope).await {
            Ok(()) => {
                status = OutboxStatus::Sent;
                break;
            }
            Err(_) => {
                retries += 1;
                if retries >= max_retries {
                    status = OutboxStatus::DeadLettered;
                    break;
                }
                status = OutboxStatus::Failed;
                last_delay = next_attempt_delay(base_retry_seconds, retries);
                assert!(!is_terminal(status));
            }
        }
    }
    assert_eq!(status, OutboxStatus::Sent);
    assert_eq!(retries, 2);
    assert!(last_delay > chrono::Duration::zero());
    assert!(is_terminal(status));

    let always_down_broker = FlakyBroker { fail_times: std::sync::atomic::AtomicU32::new(u32::MAX) };
    let mut retries = 0i32;
    let mut status = OutboxStatus::Pending;
    loop {
        match always_down_broker.publish(&envelope).await {
            Ok(()) => unreachable!("this broker never recovers"),
            Err(_) => {
                retries += 1;
                if retries >= max_retries {
                    status = OutboxStatus::DeadLettered;
                    break;
                }
            }
        }
    }
    assert_eq!(status, OutboxStatus::DeadLettered);
    assert!(is_terminal(status));
    assert_eq!(retries, max_retries);
}
