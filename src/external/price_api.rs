use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Exchange price API consumed by the Event-Study Analyser (C11), spec.md §6.4.
#[async_trait]
pub trait PriceApiClient: Send + Sync {
    async fn candles(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, PriceApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    Daily,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candle {
    pub ts: DateTime<Utc>,
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
}

#[derive(Debug, Error)]
pub enum PriceApiError {
    #[error("price api network error: {0}")]
    Network(String),
    #[error("ticker not found: {0}")]
    NotFound(String),
    #[error("missing data for the requested window")]
    MissingData,
}

pub struct HttpPriceApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPriceApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl PriceApiClient for HttpPriceApiClient {
    async fn candles(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        _interval: CandleInterval,
    ) -> Result<Vec<Candle>, PriceApiError> {
        let url = format!("{}/candles/{}", self.base_url.trim_end_matches('/'), ticker);
        let response = self
            .client
            .get(&url)
            .query(&[("from", from.to_rfc3339()), ("to", to.to_rfc3339())])
            .send()
            .await
            .map_err(|e| PriceApiError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PriceApiError::NotFound(ticker.to_string()));
        }

        response
            .json::<Vec<Candle>>()
            .await
            .map_err(|e| PriceApiError::Network(e.to_string()))
    }
}

/// Stand-in used when no `PRICE_API_URL` is configured: every lookup
/// reports missing history, which the Event-Study Analyser already treats
/// as `conf_market = 0` rather than a pipeline failure (spec.md §4.9 step 5).
pub struct NullPriceApiClient;

#[async_trait]
impl PriceApiClient for NullPriceApiClient {
    async fn candles(
        &self,
        _ticker: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        _interval: CandleInterval,
    ) -> Result<Vec<Candle>, PriceApiError> {
        Err(PriceApiError::MissingData)
    }
}
