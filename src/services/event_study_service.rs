use chrono::{DateTime, Duration, Utc};

use crate::config::EventStudyConfig;
use crate::external::{Candle, CandleInterval, PriceApiClient, PriceApiError};
use crate::models::ImpactEdge;

/// Outcome of an event-study computation (spec.md §4.9). Insufficient
/// history surfaces as `conf_market = 0` via `EventStudyOutcome::Insufficient`,
/// never as a pipeline failure. `baseline_sigma` is the estimation-window
/// σ_baseline (spec.md §4.9 step 1/4), carried alongside the edge so the
/// CMNLN engine's `conf_market = min(1, |AR| / (2·σ)) · 1_{significant}`
/// (spec.md §4.8) uses the real σ instead of reconstructing a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStudyOutcome {
    Computed { edge: ImpactEdge, baseline_sigma: f64 },
    Insufficient,
}

/// Computes abnormal return / cumulative AR / volume ratio for one ticker
/// around `event_ts` (spec.md §4.9).
pub async fn analyse(
    price_api: &dyn PriceApiClient,
    ticker: &str,
    event_id: uuid::Uuid,
    event_ts: DateTime<Utc>,
    cfg: &EventStudyConfig,
) -> EventStudyOutcome {
    let estimation_start = event_ts - Duration::days(cfg.estimation_days);
    let estimation_end = event_ts - Duration::days(1);

    let estimation_candles = match price_api
        .candles(ticker, estimation_start, estimation_end, CandleInterval::Daily)
        .await
    {
        Ok(candles) => candles,
        Err(PriceApiError::NotFound(_) | PriceApiError::MissingData) => return EventStudyOutcome::Insufficient,
        Err(_) => return EventStudyOutcome::Insufficient,
    };

    if estimation_candles.len() < cfg.min_observations {
        return EventStudyOutcome::Insufficient;
    }

    let estimation_returns = daily_returns(&estimation_candles);
    if estimation_returns.is_empty() {
        return EventStudyOutcome::Insufficient;
    }

    let baseline = mean(&estimation_returns);
    let sigma = stddev(&estimation_returns, baseline);
    let avg_vol_estimation = mean(&estimation_candles.iter().map(|c| c.v).collect::<Vec<_>>());

    let window_start = event_ts + Duration::days(cfg.event_window_days.0);
    let window_end = event_ts + Duration::days(cfg.event_window_days.1);

    let event_candles = match price_api.candles(ticker, window_start, window_end, CandleInterval::Daily).await {
        Ok(candles) if !candles.is_empty() => candles,
        _ => return EventStudyOutcome::Insufficient,
    };

    let event_returns = daily_returns(&event_candles);
    let abnormal_returns: Vec<f64> = event_returns.iter().map(|r| r - baseline).collect();
    let ar_peak = abnormal_returns.iter().cloned().fold(0.0_f64, |acc, r| if r.abs() > acc.abs() { r } else { acc });
    let car: f64 = abnormal_returns.iter().sum();

    let avg_vol_event = mean(&event_candles.iter().map(|c| c.v).collect::<Vec<_>>());
    let volume_ratio = if avg_vol_estimation > 0.0 { avg_vol_event / avg_vol_estimation } else { 0.0 };

    let significant = (sigma > 0.0 && ar_peak.abs() > cfg.significance_sigma * sigma) || volume_ratio > 2.0;

    EventStudyOutcome::Computed {
        edge: ImpactEdge {
            event_id,
            ticker: ticker.to_string(),
            ar: ar_peak,
            car,
            volume_ratio,
            window_days: cfg.event_window_days,
            significant,
        },
        baseline_sigma: sigma,
    }
}

/// `conf_market = min(1, |AR| / (2·σ)) · 1_{significant}` (spec.md §4.8),
/// using the estimation-window σ_baseline the analysis itself computed
/// (spec.md §4.9) rather than a value reconstructed from the outcome.
pub fn conf_market(outcome: &EventStudyOutcome) -> f64 {
    match outcome {
        EventStudyOutcome::Insufficient => 0.0,
        EventStudyOutcome::Computed { edge, .. } if !edge.significant => 0.0,
        EventStudyOutcome::Computed { edge, baseline_sigma } => {
            if *baseline_sigma <= 0.0 {
                0.0
            } else {
                (edge.ar.abs() / (2.0 * baseline_sigma)).min(1.0)
            }
        }
    }
}

fn daily_returns(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .filter(|w| w[0].c != 0.0)
        .map(|w| (w[1].c - w[0].c) / w[0].c)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakePriceApi {
        split: DateTime<Utc>,
        estimation: Vec<Candle>,
        event_window: Vec<Candle>,
    }

    #[async_trait]
    impl PriceApiClient for FakePriceApi {
        async fn candles(
            &self,
            _ticker: &str,
            from: DateTime<Utc>,
            _to: DateTime<Utc>,
            _interval: CandleInterval,
        ) -> Result<Vec<Candle>, PriceApiError> {
            if from < self.split {
                Ok(self.estimation.clone())
            } else {
                Ok(self.event_window.clone())
            }
        }
    }

    fn flat_candles(n: usize, start: DateTime<Utc>, close: f64, volume: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle { ts: start + Duration::days(i as i64), o: close, h: close, l: close, c: close, v: volume })
            .collect()
    }

    #[tokio::test]
    async fn insufficient_history_yields_insufficient_outcome() {
        let event_ts = Utc::now();
        let api = FakePriceApi {
            split: event_ts,
            estimation: flat_candles(5, event_ts - Duration::days(40), 100.0, 1000.0),
            event_window: vec![],
        };
        let cfg = EventStudyConfig::default();
        let outcome = analyse(&api, "SBER", uuid::Uuid::new_v4(), event_ts, &cfg).await;
        assert_eq!(outcome, EventStudyOutcome::Insufficient);
        assert_eq!(conf_market(&outcome), 0.0);
    }

    #[tokio::test]
    async fn large_move_is_flagged_significant() {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let event_ts = base + Duration::days(131);
        let mut estimation = flat_candles(25, base, 100.0, 1000.0);
        for c in estimation.iter_mut() {
            c.c += (c.ts.timestamp() % 3) as f64 * 0.01;
        }
        let event_window = vec![
            Candle { ts: event_ts, o: 100.0, h: 100.0, l: 100.0, c: 100.0, v: 5000.0 },
            Candle { ts: event_ts + Duration::days(1), o: 100.0, h: 100.0, l: 100.0, c: 120.0, v: 5000.0 },
        ];
        let api = FakePriceApi { split: event_ts, estimation, event_window };
        let cfg = EventStudyConfig::default();
        let outcome = analyse(&api, "SBER", uuid::Uuid::new_v4(), event_ts, &cfg).await;
        match outcome {
            EventStudyOutcome::Computed { edge, baseline_sigma } => {
                assert!(edge.significant);
                assert!(baseline_sigma >= 0.0);
            }
            EventStudyOutcome::Insufficient => panic!("expected computed outcome"),
        }
    }
}
