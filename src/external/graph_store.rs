use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CausalEdge, Event, ImpactEdge, Issuer};

/// Idempotent-MERGE graph store consumed by the Graph Writer (C12), spec.md
/// §6.5. No reachable graph database exists in this exercise, so only the
/// trait and an in-memory implementation are provided — recorded as an Open
/// Question resolution in DESIGN.md. `causal_edges` additionally backs the
/// CEG query surface (§1 "near real-time" query requirement) since this
/// engine has no standalone Cypher/Bolt driver to read back through.
#[async_trait]
pub trait GraphStoreClient: Send + Sync {
    async fn merge_event_node(&self, event: &Event) -> Result<(), GraphStoreError>;
    async fn merge_issuer_node(&self, issuer: &Issuer) -> Result<(), GraphStoreError>;
    async fn merge_causes_edge(&self, edge: &CausalEdge) -> Result<(), GraphStoreError>;
    async fn delete_causes_edge(
        &self,
        cause_event_id: Uuid,
        effect_event_id: Uuid,
    ) -> Result<(), GraphStoreError>;
    async fn merge_impacts_edge(&self, edge: &ImpactEdge) -> Result<(), GraphStoreError>;
    /// Every CAUSES edge currently held by the store, used to answer
    /// causal-chain queries (`ceg_engine::causal_chain`) over the HTTP API.
    async fn causal_edges(&self) -> Result<Vec<CausalEdge>, GraphStoreError>;
}

#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("graph store unreachable: {0}")]
    Unreachable(String),
    #[error("graph store rejected write: {0}")]
    Rejected(String),
}

/// In-memory stand-in for the graph database (spec.md §6.5 Open Question:
/// no graph DB is reachable in this exercise). Used both as the process's
/// default `GraphStoreClient` in `main.rs` and by the Graph Writer's own
/// tests, mirroring the teacher's in-memory `FailureCache`-style caches.
#[derive(Default)]
pub struct InMemoryGraphStore {
    pub events: Mutex<HashMap<Uuid, Event>>,
    pub issuers: Mutex<HashMap<Uuid, Issuer>>,
    pub causal_edges: Mutex<HashMap<(Uuid, Uuid), CausalEdge>>,
    pub impact_edges: Mutex<HashMap<(Uuid, String), ImpactEdge>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStoreClient for InMemoryGraphStore {
    async fn merge_event_node(&self, event: &Event) -> Result<(), GraphStoreError> {
        self.events.lock().insert(event.id, event.clone());
        Ok(())
    }

    async fn merge_issuer_node(&self, issuer: &Issuer) -> Result<(), GraphStoreError> {
        self.issuers.lock().insert(issuer.id, issuer.clone());
        Ok(())
    }

    async fn merge_causes_edge(&self, edge: &CausalEdge) -> Result<(), GraphStoreError> {
        self.causal_edges.lock().insert((edge.cause_event_id, edge.effect_event_id), edge.clone());
        Ok(())
    }

    async fn delete_causes_edge(&self, cause_event_id: Uuid, effect_event_id: Uuid) -> Result<(), GraphStoreError> {
        self.causal_edges.lock().remove(&(cause_event_id, effect_event_id));
        Ok(())
    }

    async fn merge_impacts_edge(&self, edge: &ImpactEdge) -> Result<(), GraphStoreError> {
        self.impact_edges.lock().insert((edge.event_id, edge.ticker.clone()), edge.clone());
        Ok(())
    }

    async fn causal_edges(&self) -> Result<Vec<CausalEdge>, GraphStoreError> {
        Ok(self.causal_edges.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn merge_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let event = Event {
            id: Uuid::new_v4(),
            news_id: Uuid::new_v4(),
            r#type: crate::models::EventType::RateHike,
            title: "t".to_string(),
            ts: chrono::Utc::now(),
            attrs: crate::models::EventAttrs::default(),
            is_anchor: false,
            confidence: 0.9,
        };

        store.merge_event_node(&event).await.unwrap();
        store.merge_event_node(&event).await.unwrap();

        assert_eq!(store.events.lock().len(), 1);
    }
}
