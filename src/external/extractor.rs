use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Abstract external entity/event extractor (spec.md §6.2). The pipeline
/// treats it as opaque and uses only the output fields of `Extraction`.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        text: &str,
        title: &str,
        published_at: DateTime<Utc>,
        lang: &str,
    ) -> Result<Extraction, ExtractorError>;
}

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extractor timed out")]
    Timeout,
    #[error("extractor network error: {0}")]
    Network(String),
    #[error("extractor returned malformed output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub companies: Vec<ExtractedCompany>,
    pub people: Vec<String>,
    pub markets: Vec<String>,
    pub financial_metrics: Vec<String>,
    pub event_types: Vec<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub is_anchor: Option<bool>,
    pub urgency: Urgency,
    pub confidence: f64,
    pub is_advertisement: bool,
    pub content_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedCompany {
    pub raw_text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}
