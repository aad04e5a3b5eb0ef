use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `CAUSES` edge in the graph store (spec.md §3, §6.5). Not persisted in
/// the relational store — identity is `(cause_event_id, effect_event_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CausalEdge {
    pub cause_event_id: Uuid,
    pub effect_event_id: Uuid,
    pub kind: CausalKind,
    pub sign: Sign,
    pub expected_lag: ExpectedLag,
    pub conf_prior: f64,
    pub conf_text: f64,
    pub conf_market: f64,
    pub conf_total: f64,
    pub evidence_set: Vec<String>,
    pub is_retroactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalKind {
    Hypothesis,
    Retro,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
    #[serde(rename = "±")]
    Mixed,
}

/// A symbolic lag interval, e.g. 0-1 day. Stored/compared in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedLag {
    pub min_hours: i64,
    pub max_hours: i64,
}

impl ExpectedLag {
    pub const fn hours(min_hours: i64, max_hours: i64) -> Self {
        Self { min_hours, max_hours }
    }

    pub fn contains(&self, actual_hours: i64) -> bool {
        (self.min_hours..=self.max_hours).contains(&actual_hours.abs())
    }
}

impl CausalEdge {
    /// Ordering key for "strictly dominated" comparisons: same ordered pair,
    /// higher `conf_total` wins (spec.md §4.8 "Ordering & tie-breaks").
    pub fn dominates(&self, other: &CausalEdge) -> bool {
        self.cause_event_id == other.cause_event_id
            && self.effect_event_id == other.effect_event_id
            && self.conf_total > other.conf_total
    }
}
