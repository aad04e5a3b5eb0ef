mod broker;
mod extractor;
mod fallback_extractor;
mod graph_store;
mod html_adapter;
mod message_channel_adapter;
mod price_api;
mod securities_master;
mod source_adapter;

pub use broker::{BrokerClient, BrokerError, HttpBrokerClient, NullBrokerClient};
pub use extractor::{ExtractedCompany, Extraction, Extractor, ExtractorError, Urgency};
pub use fallback_extractor::FallbackExtractor;
pub use graph_store::{GraphStoreClient, GraphStoreError, InMemoryGraphStore};
pub use html_adapter::HtmlAdapter;
pub use message_channel_adapter::MessageChannelAdapter;
pub use price_api::{Candle, CandleInterval, HttpPriceApiClient, NullPriceApiClient, PriceApiClient, PriceApiError};
pub use securities_master::{
    HttpSecuritiesMasterClient, NullSecuritiesMasterClient, SecuritiesMasterClient, SecuritiesMasterError,
    SecurityMatch,
};
pub use source_adapter::{
    backoff_delay, clamp_horizon, commit_key, AdapterError, PollOutcome, SourceAdapter,
    MAX_BACKFILL_HORIZON_DAYS, MAX_CHANNEL_RETRIES,
};
