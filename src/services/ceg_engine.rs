use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::config::{CegConfig, EventStudyConfig};
use crate::external::PriceApiClient;
use crate::models::{CausalEdge, CausalKind, Event, EventType, ExpectedLag, Sign};
use crate::services::event_study_service;

/// An event together with the full text of its originating News, the only
/// extra context the textual-marker scorer needs (spec.md §4.8 `conf_text`).
#[derive(Debug, Clone)]
pub struct EventWithText {
    pub event: Event,
    pub news_text: String,
}

/// Domain-prior table keyed by `(cause_type, effect_type)` (spec.md §4.8
/// `conf_prior`). Absent pairs score 0. A handful of priors drawn directly
/// from spec.md's own scenarios (S1, S2) plus the obvious macro/sector
/// analogues; operators may extend this at the config layer in a future
/// iteration (not required by the current spec).
fn domain_priors() -> &'static HashMap<(EventType, EventType), (f64, Sign, ExpectedLag)> {
    use EventType::*;
    static TABLE: once_cell::sync::OnceCell<HashMap<(EventType, EventType), (f64, Sign, ExpectedLag)>> =
        once_cell::sync::OnceCell::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert((RateHike, RubAppreciation), (0.65, Sign::Positive, ExpectedLag::hours(0, 48)));
        m.insert((RateCut, RubDepreciation), (0.6, Sign::Negative, ExpectedLag::hours(0, 48)));
        m.insert((Sanctions, StockDrop), (0.7, Sign::Negative, ExpectedLag::hours(0, 72)));
        m.insert((Sanctions, RubDepreciation), (0.6, Sign::Negative, ExpectedLag::hours(0, 72)));
        m.insert((Default, StockDrop), (0.75, Sign::Negative, ExpectedLag::hours(0, 48)));
        m.insert((EarningsMiss, StockDrop), (0.6, Sign::Negative, ExpectedLag::hours(0, 24)));
        m.insert((EarningsBeat, StockRally), (0.6, Sign::Positive, ExpectedLag::hours(0, 24)));
        m.insert((GuidanceCut, StockDrop), (0.55, Sign::Negative, ExpectedLag::hours(0, 24)));
        m.insert((ManagementChange, StockDrop), (0.4, Sign::Mixed, ExpectedLag::hours(0, 48)));
        m.insert((Mna, StockRally), (0.5, Sign::Positive, ExpectedLag::hours(0, 24)));
        m.insert((Accident, StockDrop), (0.5, Sign::Negative, ExpectedLag::hours(0, 48)));
        m.insert((Strike, Production), (0.55, Sign::Negative, ExpectedLag::hours(0, 168)));
        m.insert((SupplyChain, Production), (0.5, Sign::Negative, ExpectedLag::hours(0, 168)));
        m
    })
}

/// Closed set of causal connectors with per-marker weights (spec.md §4.8
/// `conf_text`), Russian markers plus their English analogues.
const TEXT_MARKERS: &[(&str, f64)] = &[
    ("из-за", 0.8),
    ("в результате", 0.85),
    ("привело к", 0.9),
    ("на фоне", 0.6),
    ("после", 0.5),
    ("because of", 0.8),
    ("as a result of", 0.85),
    ("led to", 0.9),
    ("following", 0.5),
];

/// Max weight of any matched causal connector appearing in either text
/// (spec.md §4.8 `conf_text`), plus the markers that fired as evidence.
pub fn text_confidence(text_a: &str, text_b: &str) -> (f64, Vec<String>) {
    let combined = format!("{} {}", text_a.to_lowercase(), text_b.to_lowercase());
    let mut best = 0.0_f64;
    let mut evidence = Vec::new();
    for (marker, weight) in TEXT_MARKERS {
        if combined.contains(marker) {
            evidence.push(marker.to_string());
            if *weight > best {
                best = *weight;
            }
        }
    }
    (best, evidence)
}

/// Scores a directed candidate pair `e_a -> e_b` (spec.md §4.8 `score`).
pub async fn score_pair(
    e_a: &EventWithText,
    e_b: &EventWithText,
    price_api: &dyn PriceApiClient,
    cfg: &CegConfig,
    event_study_cfg: &EventStudyConfig,
) -> CausalEdge {
    let (conf_prior, sign, expected_lag) = domain_priors()
        .get(&(e_a.event.r#type, e_b.event.r#type))
        .cloned()
        .unwrap_or((0.0, Sign::Mixed, ExpectedLag::hours(0, 24 * cfg.lookback_days)));

    let (conf_text, evidence_set) = text_confidence(&e_a.news_text, e_b.news_text.as_str());

    let conf_market = match e_b.event.attrs.first_ticker() {
        Some(ticker) => {
            let outcome =
                event_study_service::analyse(price_api, ticker, e_b.event.id, e_b.event.ts, event_study_cfg).await;
            event_study_service::conf_market(&outcome)
        }
        None => 0.0,
    };

    let mut conf_total = cfg.weight_prior * conf_prior + cfg.weight_text * conf_text + cfg.weight_market * conf_market;

    let actual_lag_hours = (e_b.event.ts - e_a.event.ts).num_hours();
    if !expected_lag.contains(actual_lag_hours) {
        conf_total *= cfg.lag_violation_penalty;
    }

    CausalEdge {
        cause_event_id: e_a.event.id,
        effect_event_id: e_b.event.id,
        kind: CausalKind::Hypothesis,
        sign,
        expected_lag,
        conf_prior,
        conf_text,
        conf_market,
        conf_total,
        evidence_set,
        is_retroactive: false,
    }
}

/// Forward-linking candidates: past events within `[e_new.ts - W_look,
/// e_new.ts)` (spec.md §4.8 step 1).
pub fn forward_candidates<'a>(
    e_new: &Event,
    past_events: &'a [EventWithText],
    lookback_days: i64,
) -> Vec<&'a EventWithText> {
    let floor = e_new.ts - chrono::Duration::days(lookback_days);
    past_events.iter().filter(|c| c.event.ts >= floor && c.event.ts < e_new.ts).collect()
}

/// Retroactive-linking candidates: future events within `(e_new.ts,
/// e_new.ts + W_retro]` whose type makes `e_new` retro-eligible as a cause
/// (spec.md §4.8 step 3).
pub fn retro_candidates<'a>(
    e_new: &Event,
    future_events: &'a [EventWithText],
    retro_window_days: i64,
) -> Vec<&'a EventWithText> {
    if !EventType::retro_eligible_default().contains(&e_new.r#type) {
        return Vec::new();
    }
    let ceiling = e_new.ts + chrono::Duration::days(retro_window_days);
    future_events.iter().filter(|c| c.event.ts > e_new.ts && c.event.ts <= ceiling).collect()
}

/// Keeps only the highest-scoring edge per ordered pair, dropping strictly
/// dominated duplicates (spec.md §4.8 "Ordering & tie-breaks"). Also drops
/// any edge below `min_confidence` (spec.md §4.8 step 4 / invariant 3).
pub fn select_surviving_edges(mut candidates: Vec<CausalEdge>, min_confidence: f64) -> Vec<CausalEdge> {
    candidates.retain(|e| e.conf_total >= min_confidence);

    let mut best: HashMap<(Uuid, Uuid), CausalEdge> = HashMap::new();
    for edge in candidates {
        let key = (edge.cause_event_id, edge.effect_event_id);
        match best.get(&key) {
            Some(existing) if existing.conf_total >= edge.conf_total => {}
            _ => {
                best.insert(key, edge);
            }
        }
    }
    best.into_values().collect()
}

/// Upgrades an edge's `kind` to `Confirmed` once all three sub-confidences
/// clear 0.6 (spec.md §4.8 step 4).
pub fn maybe_confirm(mut edge: CausalEdge) -> CausalEdge {
    if edge.conf_prior >= 0.6 && edge.conf_text >= 0.6 && edge.conf_market >= 0.6 {
        edge.kind = CausalKind::Confirmed;
    }
    edge
}

pub fn mark_retroactive(mut edge: CausalEdge) -> CausalEdge {
    edge.is_retroactive = true;
    edge.kind = CausalKind::Retro;
    edge
}

/// Per-event-id keyed mutual exclusion so two concurrently-arriving events
/// never redundantly re-score the same pair at once (spec.md §5 "CEG"
/// ordering note).
#[derive(Clone, Default)]
pub struct EventScoringLocks {
    locks: Arc<DashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl EventScoringLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, event_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks.entry(event_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

/// BFS causal-chain traversal to a caller-supplied `max_depth` (default 3),
/// spec.md §4.8 "Termination & chains". `forward` selects CAUSES (true) vs
/// is-caused-by (false) traversal direction; an optional confidence floor
/// prunes weak edges.
pub fn causal_chain(
    edges: &[CausalEdge],
    start: Uuid,
    max_depth: usize,
    min_confidence: Option<f64>,
    forward: bool,
) -> Vec<Vec<Uuid>> {
    let mut adjacency: HashMap<Uuid, Vec<&CausalEdge>> = HashMap::new();
    for edge in edges {
        if let Some(floor) = min_confidence {
            if edge.conf_total < floor {
                continue;
            }
        }
        let key = if forward { edge.cause_event_id } else { edge.effect_event_id };
        adjacency.entry(key).or_default().push(edge);
    }

    let mut paths = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(vec![start]);

    while let Some(path) = queue.pop_front() {
        if path.len() - 1 >= max_depth {
            continue;
        }
        let tail = *path.last().unwrap();
        let Some(next_edges) = adjacency.get(&tail) else { continue };
        for edge in next_edges {
            let next = if forward { edge.effect_event_id } else { edge.cause_event_id };
            if path.contains(&next) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            paths.push(extended.clone());
            queue.push_back(extended);
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventAttrs;

    fn event(event_type: EventType, ts: DateTime<Utc>, ticker: Option<&str>) -> Event {
        Event {
            id: Uuid::new_v4(),
            news_id: Uuid::new_v4(),
            r#type: event_type,
            title: "t".to_string(),
            ts,
            attrs: EventAttrs { tickers: ticker.map(|t| vec![t.to_string()]).unwrap_or_default(), ..Default::default() },
            is_anchor: false,
            confidence: 0.9,
        }
    }

    #[test]
    fn text_confidence_finds_strongest_marker() {
        let (conf, evidence) = text_confidence("Рубль укрепился после решения", "в результате действий ЦБ");
        assert_eq!(conf, 0.85);
        assert!(evidence.contains(&"в результате".to_string()));
    }

    #[test]
    fn no_marker_yields_zero_confidence() {
        let (conf, evidence) = text_confidence("обычный текст", "без маркеров вовсе");
        assert_eq!(conf, 0.0);
        assert!(evidence.is_empty());
    }

    #[test]
    fn forward_candidates_respects_lookback_window() {
        let now = Utc::now();
        let e_new = event(EventType::RubAppreciation, now, None);
        let in_window = EventWithText { event: event(EventType::RateHike, now - chrono::Duration::days(10), None), news_text: String::new() };
        let out_of_window = EventWithText { event: event(EventType::RateHike, now - chrono::Duration::days(40), None), news_text: String::new() };
        let candidates = forward_candidates(&e_new, &[in_window.clone(), out_of_window], 30);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].event.ts, in_window.event.ts);
    }

    #[test]
    fn retro_candidates_only_for_retro_eligible_types() {
        let now = Utc::now();
        let e_new_sanctions = event(EventType::Sanctions, now, None);
        let e_new_earnings = event(EventType::Earnings, now, None);
        let future = EventWithText { event: event(EventType::StockDrop, now + chrono::Duration::days(2), None), news_text: String::new() };

        assert_eq!(retro_candidates(&e_new_sanctions, &[future.clone()], 30).len(), 1);
        assert_eq!(retro_candidates(&e_new_earnings, &[future], 30).len(), 0);
    }

    #[test]
    fn select_surviving_edges_drops_below_threshold_and_dominated() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let weak = CausalEdge {
            cause_event_id: a,
            effect_event_id: b,
            kind: CausalKind::Hypothesis,
            sign: Sign::Positive,
            expected_lag: ExpectedLag::hours(0, 24),
            conf_prior: 0.2,
            conf_text: 0.0,
            conf_market: 0.0,
            conf_total: 0.2,
            evidence_set: vec![],
            is_retroactive: false,
        };
        let strong = CausalEdge { conf_total: 0.8, ..weak.clone() };
        let below_threshold = CausalEdge {
            cause_event_id: Uuid::new_v4(),
            effect_event_id: Uuid::new_v4(),
            conf_total: 0.1,
            ..weak.clone()
        };

        let survivors = select_surviving_edges(vec![weak, strong.clone(), below_threshold], 0.3);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].conf_total, strong.conf_total);
    }

    #[test]
    fn causal_chain_finds_two_hop_path() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edge_ab = CausalEdge {
            cause_event_id: a,
            effect_event_id: b,
            kind: CausalKind::Hypothesis,
            sign: Sign::Positive,
            expected_lag: ExpectedLag::hours(0, 24),
            conf_prior: 0.6,
            conf_text: 0.6,
            conf_market: 0.6,
            conf_total: 0.6,
            evidence_set: vec![],
            is_retroactive: false,
        };
        let edge_bc = CausalEdge { cause_event_id: b, effect_event_id: c, ..edge_ab.clone() };

        let chains = causal_chain(&[edge_ab, edge_bc], a, 3, None, true);
        assert!(chains.iter().any(|p| p == &vec![a, b, c]));
    }
}
