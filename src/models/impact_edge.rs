use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An `IMPACTS` edge in the graph store, the output of the Event-Study
/// Analyser (C11) for one `(event, instrument)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactEdge {
    pub event_id: Uuid,
    pub ticker: String,
    pub ar: f64,
    pub car: f64,
    pub volume_ratio: f64,
    pub window_days: (i64, i64),
    pub significant: bool,
}
