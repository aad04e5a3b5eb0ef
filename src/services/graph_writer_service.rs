use crate::errors::AppError;
use crate::external::GraphStoreClient;
use crate::models::{CausalEdge, Event, ImpactEdge, Issuer};

/// Thin idempotent wrapper over `GraphStoreClient` (spec.md §4.10): every
/// mutation is a MERGE keyed by stable identifiers, so replaying the same
/// write is always safe.
pub struct GraphWriter<'a> {
    client: &'a dyn GraphStoreClient,
}

impl<'a> GraphWriter<'a> {
    pub fn new(client: &'a dyn GraphStoreClient) -> Self {
        Self { client }
    }

    pub async fn write_event(&self, event: &Event) -> Result<(), AppError> {
        self.client
            .merge_event_node(event)
            .await
            .map_err(|e| AppError::DownstreamFailure(e.to_string()))
    }

    pub async fn write_issuer(&self, issuer: &Issuer) -> Result<(), AppError> {
        self.client
            .merge_issuer_node(issuer)
            .await
            .map_err(|e| AppError::DownstreamFailure(e.to_string()))
    }

    pub async fn write_causal_edge(&self, edge: &CausalEdge) -> Result<(), AppError> {
        self.client
            .merge_causes_edge(edge)
            .await
            .map_err(|e| AppError::DownstreamFailure(e.to_string()))
    }

    pub async fn remove_causal_edge(
        &self,
        cause_event_id: uuid::Uuid,
        effect_event_id: uuid::Uuid,
    ) -> Result<(), AppError> {
        self.client
            .delete_causes_edge(cause_event_id, effect_event_id)
            .await
            .map_err(|e| AppError::DownstreamFailure(e.to_string()))
    }

    pub async fn write_impact_edge(&self, edge: &ImpactEdge) -> Result<(), AppError> {
        self.client
            .merge_impacts_edge(edge)
            .await
            .map_err(|e| AppError::DownstreamFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::graph_store::InMemoryGraphStore;

    #[tokio::test]
    async fn writer_merge_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let writer = GraphWriter::new(&store);

        let event = Event {
            id: uuid::Uuid::new_v4(),
            news_id: uuid::Uuid::new_v4(),
            r#type: crate::models::EventType::RateHike,
            title: "t".to_string(),
            ts: chrono::Utc::now(),
            attrs: crate::models::EventAttrs::default(),
            is_anchor: false,
            confidence: 0.9,
        };

        writer.write_event(&event).await.unwrap();
        writer.write_event(&event).await.unwrap();

        assert_eq!(store.events.lock().len(), 1);
    }
}
