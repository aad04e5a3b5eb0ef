use serde::Deserialize;

use crate::models::SourceConfigEntry;

/// The structured configuration surface described in spec.md §6.7. Loaded
/// once at startup in `main.rs`: scalar knobs come from the environment
/// (teacher's `dotenvy::dotenv()` convention), the `sources[]` list comes
/// from a `sources.yml`-style file whose path is given by `SOURCES_CONFIG`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: std::net::SocketAddr,
    pub antispam: AntispamConfig,
    pub enrichment: EnrichmentConfig,
    pub ceg: CegConfig,
    pub event_study: EventStudyConfig,
    pub outbox: OutboxConfig,
    pub sources: Vec<SourceConfigEntry>,
    pub broker_url: Option<String>,
    pub securities_master_url: Option<String>,
    pub price_api_url: Option<String>,
    pub graph_store_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AntispamConfig {
    pub threshold_default: f64,
    pub threshold_trusted: f64,
    pub trusted_level: i16,
    pub rules: Vec<AntispamRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AntispamRuleConfig {
    pub id: String,
    pub weight: f64,
    #[serde(flatten)]
    pub kind: AntispamRuleKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AntispamRuleKind {
    Hashtag { pattern: String },
    Keyword { pattern: String },
    UrlShape { deny_tlds: Vec<String>, shorteners: Vec<String> },
    LinkCount { min_links: usize },
    ForwardIndicator,
    TitleToLinkRatio { max_ratio: f64 },
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub workers: usize,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub max_events_per_news: usize,
    pub max_backlog: usize,
    pub backoff_poll_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CegConfig {
    pub lookback_days: i64,
    pub retro_window_days: i64,
    pub min_confidence: f64,
    pub weight_prior: f64,
    pub weight_text: f64,
    pub weight_market: f64,
    pub max_chain_depth: usize,
    pub lag_violation_penalty: f64,
}

#[derive(Debug, Clone)]
pub struct EventStudyConfig {
    pub estimation_days: i64,
    pub event_window_days: (i64, i64),
    pub significance_sigma: f64,
    pub min_observations: usize,
}

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub batch_size: i64,
    pub base_retry_seconds: i64,
    pub max_retries: i32,
    pub keep_days: i64,
}

impl Default for AntispamConfig {
    fn default() -> Self {
        Self {
            threshold_default: 5.0,
            threshold_trusted: 8.0,
            trusted_level: 7,
            rules: Vec::new(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            timeout_ms: 60_000,
            max_retries: 3,
            max_events_per_news: 5,
            max_backlog: 10_000,
            backoff_poll_secs: 30,
        }
    }
}

impl Default for CegConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            retro_window_days: 30,
            min_confidence: 0.3,
            weight_prior: 0.4,
            weight_text: 0.3,
            weight_market: 0.3,
            max_chain_depth: 3,
            lag_violation_penalty: 0.75,
        }
    }
}

impl Default for EventStudyConfig {
    fn default() -> Self {
        Self {
            estimation_days: 30,
            event_window_days: (0, 1),
            significance_sigma: 2.0,
            min_observations: 20,
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            base_retry_seconds: 60,
            max_retries: 3,
            keep_days: 7,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {key}: {source}")]
    InvalidValue { key: &'static str, source: String },
    #[error("failed to read sources config at {path}: {source}")]
    SourcesFile { path: String, source: String },
}

impl Config {
    /// Loads scalar configuration from the environment and the sources list
    /// from a YAML file, matching spec.md §6.7/§6.8 (`ConfigError` is fatal
    /// on startup, exit code 1).
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue { key: "BIND_ADDR", source: format!("{e}") })?;

        let sources_path = std::env::var("SOURCES_CONFIG").unwrap_or_else(|_| "sources.yml".to_string());
        let sources_file = load_sources_file(&sources_path)?;

        let mut antispam = AntispamConfig::default();
        if let Ok(v) = std::env::var("ANTISPAM_THRESHOLD_DEFAULT") {
            antispam.threshold_default = parse_env("ANTISPAM_THRESHOLD_DEFAULT", &v)?;
        }
        if let Ok(v) = std::env::var("ANTISPAM_THRESHOLD_TRUSTED") {
            antispam.threshold_trusted = parse_env("ANTISPAM_THRESHOLD_TRUSTED", &v)?;
        }
        antispam.rules = sources_file.antispam_rules;
        let sources = sources_file.sources;

        Ok(Self {
            database_url,
            bind_addr,
            antispam,
            enrichment: EnrichmentConfig::default(),
            ceg: CegConfig::default(),
            event_study: EventStudyConfig::default(),
            outbox: OutboxConfig::default(),
            sources,
            broker_url: std::env::var("BROKER_URL").ok(),
            securities_master_url: std::env::var("SECURITIES_MASTER_URL").ok(),
            price_api_url: std::env::var("PRICE_API_URL").ok(),
            graph_store_url: std::env::var("GRAPH_STORE_URL").ok(),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue { key, source: e.to_string() })
}

#[derive(Debug, Deserialize, Default)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<SourceConfigEntry>,
    #[serde(default)]
    antispam_rules: Vec<AntispamRuleConfig>,
}

fn load_sources_file(path: &str) -> Result<SourcesFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::SourcesFile { path: path.to_string(), source: e.to_string() }),
        Err(_) => Ok(SourcesFile::default()),
    }
}

/// Lookup used by the Antispam Scorer (C2): threshold rises monotonically
/// with trust level (spec.md §4.2).
pub fn antispam_threshold(cfg: &AntispamConfig, trust_level: i16) -> f64 {
    if trust_level >= cfg.trusted_level {
        cfg.threshold_trusted
    } else {
        cfg.threshold_default
    }
}
