use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed event extracted from an enriched News item. One News yields
/// between 0 and `max_events_per_news` (default 5) events.
///
/// Not derived via `sqlx::FromRow`: `attrs` is stored as `jsonb` and the
/// event_type/type column rename need a row struct, built in
/// `db::event_queries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub news_id: Uuid,
    pub r#type: EventType,
    pub title: String,
    pub ts: DateTime<Utc>,
    pub attrs: EventAttrs,
    pub is_anchor: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventAttrs {
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub markets: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl EventAttrs {
    /// First ticker in extraction order, used by the CMNLN engine to pick
    /// the instrument for `conf_market` (spec.md §4.8).
    pub fn first_ticker(&self) -> Option<&str> {
        self.tickers.first().map(|s| s.as_str())
    }
}

/// The closed family of event types the Event Extractor (C9) recognizes.
/// spec.md §9 leaves the exact anchor-eligible subset as configuration;
/// `EventType::anchor_eligible_default` documents the set this crate ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Sanctions,
    RateHike,
    RateCut,
    Earnings,
    EarningsBeat,
    EarningsMiss,
    Guidance,
    GuidanceCut,
    Mna,
    Ipo,
    Dividends,
    DividendCut,
    Buyback,
    Default,
    ManagementChange,
    SupplyChain,
    Production,
    Accident,
    Strike,
    Legal,
    StockDrop,
    StockRally,
    RubAppreciation,
    RubDepreciation,
    Other,
}

impl EventType {
    pub fn all() -> &'static [EventType] {
        use EventType::*;
        &[
            Sanctions, RateHike, RateCut, Earnings, EarningsBeat, EarningsMiss, Guidance,
            GuidanceCut, Mna, Ipo, Dividends, DividendCut, Buyback, Default, ManagementChange,
            SupplyChain, Production, Accident, Strike, Legal, StockDrop, StockRally,
            RubAppreciation, RubDepreciation, Other,
        ]
    }

    /// Event types considered significant enough to seed retroactive
    /// analysis and causal chains (spec.md §3 invariant on `is_anchor`,
    /// §9 Open Question — exposed as configuration, this is the default).
    pub fn anchor_eligible_default() -> &'static [EventType] {
        use EventType::*;
        &[Sanctions, Default, Mna, ManagementChange, RateHike, RateCut]
    }

    /// Event types eligible to seed retroactive linking (spec.md §4.8 step 3).
    pub fn retro_eligible_default() -> &'static [EventType] {
        use EventType::*;
        &[Sanctions, Default, Legal]
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub r#type: EventType,
    pub title: String,
    pub ts: DateTime<Utc>,
    pub attrs: EventAttrs,
    pub is_anchor: bool,
    pub confidence: f64,
}
