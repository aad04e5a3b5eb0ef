use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// The reference securities master the Linker (C7) queries on a cache miss
/// (spec.md §6.3).
#[async_trait]
pub trait SecuritiesMasterClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SecurityMatch>, SecuritiesMasterError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityMatch {
    pub secid: String,
    pub isin: Option<String>,
    pub shortname: String,
    pub name: String,
    pub is_traded: bool,
    pub market: String,
    pub board: Option<String>,
}

#[derive(Debug, Error)]
pub enum SecuritiesMasterError {
    #[error("securities master network error: {0}")]
    Network(String),
    #[error("securities master returned malformed output: {0}")]
    Malformed(String),
}

/// Thin `reqwest` client over an HTTP securities-master endpoint.
pub struct HttpSecuritiesMasterClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSecuritiesMasterClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl SecuritiesMasterClient for HttpSecuritiesMasterClient {
    async fn search(&self, query: &str) -> Result<Vec<SecurityMatch>, SecuritiesMasterError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| SecuritiesMasterError::Network(e.to_string()))?;

        response
            .json::<Vec<SecurityMatch>>()
            .await
            .map_err(|e| SecuritiesMasterError::Malformed(e.to_string()))
    }
}

/// Stand-in used when no `SECURITIES_MASTER_URL` is configured: every query
/// misses, so the Linker falls through to "return unresolved" (spec.md
/// §4.5 step 5) rather than failing the enrichment pipeline.
pub struct NullSecuritiesMasterClient;

#[async_trait]
impl SecuritiesMasterClient for NullSecuritiesMasterClient {
    async fn search(&self, _query: &str) -> Result<Vec<SecurityMatch>, SecuritiesMasterError> {
        Ok(Vec::new())
    }
}
