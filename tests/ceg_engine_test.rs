//! End-to-end causal-scoring scenarios combining real event fixtures with
//! the CEG engine's own scoring, survival-filtering and confirmation steps
//! (no live Postgres needed: everything here is pure computation plus a
//! fake price feed).

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use newsceg_backend::config::{CegConfig, EventStudyConfig};
use newsceg_backend::external::{Candle, CandleInterval, PriceApiClient, PriceApiError};
use newsceg_backend::models::{CausalKind, Event, EventAttrs, EventType, Sign};
use newsceg_backend::services::ceg_engine::{
    forward_candidates, maybe_confirm, retro_candidates, score_pair, select_surviving_edges, EventWithText,
};

struct FakePriceApi {
    estimation: Vec<Candle>,
    event_window: Vec<Candle>,
    split: chrono::DateTime<Utc>,
}

#[async_trait]
impl PriceApiClient for FakePriceApi {
    async fn candles(
        &self,
        _ticker: &str,
        from: chrono::DateTime<Utc>,
        _to: chrono::DateTime<Utc>,
        _interval: CandleInterval,
    ) -> Result<Vec<Candle>, PriceApiError> {
        if from < self.split {
            Ok(self.estimation.clone())
        } else {
            Ok(self.event_window.clone())
        }
    }
}

fn flat_candles(n: usize, start: chrono::DateTime<Utc>, close: f64, volume: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            ts: start + Duration::days(i as i64),
            o: close,
            h: close,
            l: close,
            c: close + (i % 3) as f64 * 0.01,
            v: volume,
        })
        .collect()
}

fn event(event_type: EventType, ts: chrono::DateTime<Utc>, ticker: Option<&str>) -> Event {
    Event {
        id: Uuid::new_v4(),
        news_id: Uuid::new_v4(),
        r#type: event_type,
        title: format!("{event_type:?}"),
        ts,
        attrs: EventAttrs { tickers: ticker.map(|t| vec![t.to_string()]).unwrap_or_default(), ..Default::default() },
        is_anchor: false,
        confidence: 0.9,
    }
}

/// S1 (spec.md §8): a rate-hike announcement precedes a ruble-appreciation
/// story carrying a causal marker ("на фоне") and a confirmed market move —
/// forward linking should produce a surviving `Hypothesis` edge that
/// upgrades to `Confirmed`.
#[tokio::test]
async fn s1_forward_link_rate_hike_to_ruble_appreciation() {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let cause = EventWithText {
        event: event(EventType::RateHike, base, None),
        news_text: "Банк России повысил ключевую ставку до 16%".to_string(),
    };
    let effect_ts = base + Duration::hours(6);
    let effect = EventWithText {
        event: event(EventType::RubAppreciation, effect_ts, Some("USDRUB")),
        news_text: "Рубль укрепился на фоне решения ЦБ по ставке".to_string(),
    };

    let ceg_cfg = CegConfig::default();
    let event_study_cfg = EventStudyConfig::default();

    let candidates = forward_candidates(&effect.event, &[cause.clone()], ceg_cfg.lookback_days);
    assert_eq!(candidates.len(), 1);

    let estimation = flat_candles(25, base - Duration::days(30), 60.0, 1_000_000.0);
    let event_window = vec![
        Candle { ts: effect_ts, o: 60.0, h: 61.0, l: 59.5, c: 60.0, v: 1_000_000.0 },
        Candle { ts: effect_ts + Duration::days(1), o: 60.0, h: 63.0, l: 59.5, c: 63.5, v: 2_500_000.0 },
    ];
    let price_api = FakePriceApi { estimation, event_window, split: effect_ts };

    let edge = score_pair(&cause, &effect, &price_api, &ceg_cfg, &event_study_cfg).await;

    assert_eq!(edge.cause_event_id, cause.event.id);
    assert_eq!(edge.effect_event_id, effect.event.id);
    assert_eq!(edge.sign, Sign::Positive);
    assert!(edge.conf_prior > 0.0, "RateHike->RubAppreciation should carry a domain prior");
    assert!(edge.conf_text > 0.0, "'на фоне' marker should be picked up");
    assert!(edge.conf_market > 0.0, "a >5% abnormal move should register as market confirmation");

    let survivors = select_surviving_edges(vec![edge], ceg_cfg.min_confidence);
    assert_eq!(survivors.len(), 1);

    let confirmed = maybe_confirm(survivors.into_iter().next().unwrap());
    if confirmed.conf_prior >= 0.6 && confirmed.conf_text >= 0.6 && confirmed.conf_market >= 0.6 {
        assert_eq!(confirmed.kind, CausalKind::Confirmed);
    } else {
        assert_eq!(confirmed.kind, CausalKind::Hypothesis);
    }
}

/// S2 (spec.md §8): a sanctions announcement is retro-eligible, so a later
/// stock-drop story should surface it as a retroactive-linking candidate
/// even though the sanctions event was stored first.
#[tokio::test]
async fn s2_retroactive_link_sanctions_to_stock_drop() {
    let base = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
    let sanctions = event(EventType::Sanctions, base, None);
    let drop_ts = base + Duration::days(2);
    let drop = EventWithText {
        event: event(EventType::StockDrop, drop_ts, Some("GAZP")),
        news_text: "Акции упали в результате новых санкций".to_string(),
    };

    let retro_window_days = CegConfig::default().retro_window_days;
    let candidates = retro_candidates(&sanctions, &[drop.clone()], retro_window_days);
    assert_eq!(candidates.len(), 1, "Sanctions is retro-eligible and StockDrop falls inside the retro window");

    let not_retro_eligible = event(EventType::Earnings, base, None);
    assert!(retro_candidates(&not_retro_eligible, &[drop], retro_window_days).is_empty());

    let ceg_cfg = CegConfig::default();
    let event_study_cfg = EventStudyConfig::default();
    let sanctions_with_text =
        EventWithText { event: sanctions.clone(), news_text: "Введены новые санкции против компании".to_string() };
    let drop_with_text = EventWithText {
        event: event(EventType::StockDrop, drop_ts, Some("GAZP")),
        news_text: "Акции упали в результате новых санкций".to_string(),
    };

    let estimation = flat_candles(25, base - Duration::days(30), 150.0, 500_000.0);
    let event_window = vec![
        Candle { ts: drop_ts, o: 150.0, h: 150.0, l: 140.0, c: 150.0, v: 500_000.0 },
        Candle { ts: drop_ts + Duration::days(1), o: 150.0, h: 150.0, l: 120.0, c: 128.0, v: 1_500_000.0 },
    ];
    let price_api = FakePriceApi { estimation, event_window, split: drop_ts };

    let edge = score_pair(&sanctions_with_text, &drop_with_text, &price_api, &ceg_cfg, &event_study_cfg).await;
    let retro_edge = newsceg_backend::services::ceg_engine::mark_retroactive(edge);

    assert!(retro_edge.is_retroactive);
    assert_eq!(retro_edge.kind, CausalKind::Retro);
    assert_eq!(retro_edge.sign, Sign::Negative);
    assert!(retro_edge.conf_text > 0.0, "'в результате' marker should be picked up");
}
