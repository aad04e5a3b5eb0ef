use async_trait::async_trait;
use thiserror::Error;

use crate::models::BrokerEnvelope;

/// Durable publish target consumed by the Outbox Relay (C13), spec.md §6.6.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn publish(&self, envelope: &BrokerEnvelope) -> Result<(), BrokerError>;
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker unreachable: {0}")]
    Unreachable(String),
    #[error("broker rejected envelope: {0}")]
    Rejected(String),
}

/// Publishes over HTTP to a broker gateway endpoint, one POST per envelope.
pub struct HttpBrokerClient {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpBrokerClient {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl BrokerClient for HttpBrokerClient {
    async fn publish(&self, envelope: &BrokerEnvelope) -> Result<(), BrokerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| BrokerError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Rejected(format!("{status}: {body}")));
        }

        Ok(())
    }
}

/// Stand-in used when no `BROKER_URL` is configured: logs and accepts every
/// envelope, so the Outbox Relay (C13) still exercises its batch/mark-sent
/// loop end to end in an environment with no reachable message broker.
pub struct NullBrokerClient;

#[async_trait]
impl BrokerClient for NullBrokerClient {
    async fn publish(&self, envelope: &BrokerEnvelope) -> Result<(), BrokerError> {
        tracing::debug!(topic = %envelope.topic, "no broker configured, discarding published envelope");
        Ok(())
    }
}
