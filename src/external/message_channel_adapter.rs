use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{RawMediaRef, RawNews, Source};

use super::source_adapter::{clamp_horizon, AdapterError, PollOutcome, SourceAdapter};

/// Polls a message-channel style source (a Telegram-like broadcast feed)
/// through an HTTP gateway that exposes the channel's history as JSON pages.
/// One instance is shared across all sources whose `kind` is `message_channel`.
pub struct MessageChannelAdapter {
    client: reqwest::Client,
}

impl MessageChannelAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for MessageChannelAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChannelPage {
    items: Vec<ChannelItem>,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    text: String,
    #[serde(default)]
    title: Option<String>,
    date: DateTime<Utc>,
    #[serde(default)]
    media: Vec<ChannelMedia>,
    #[serde(default)]
    permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelMedia {
    url: String,
    #[serde(default = "default_media_kind")]
    kind: String,
}

fn default_media_kind() -> String {
    "photo".to_string()
}

impl ChannelItem {
    fn into_raw_news(self, source_id: Uuid) -> RawNews {
        RawNews {
            source_id,
            external_id: self.id,
            title: self.title.unwrap_or_default(),
            text: self.text,
            summary: None,
            published_at: self.date,
            url: self.permalink,
            media_refs: self
                .media
                .into_iter()
                .map(|m| RawMediaRef { url: m.url, kind: m.kind })
                .collect(),
            raw_meta: serde_json::json!({}),
        }
    }
}

#[async_trait]
impl SourceAdapter for MessageChannelAdapter {
    async fn poll(
        &self,
        source: &Source,
        cursor: Option<&str>,
    ) -> Result<PollOutcome, AdapterError> {
        let url = format!("{}/updates", source.base_locator.trim_end_matches('/'));
        let mut request = self.client.get(&url);
        if let Some(cursor) = cursor {
            request = request.query(&[("since", cursor)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                AdapterError::Transient(e.to_string())
            } else {
                AdapterError::NotFoundOrPermission
            }
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdapterError::NotFoundOrPermission);
        }

        let page: ChannelPage = response
            .json()
            .await
            .map_err(|e| AdapterError::MalformedItem(e.to_string()))?;

        let new_cursor = page.next_cursor;
        let items = page
            .items
            .into_iter()
            .map(|item| item.into_raw_news(source.id))
            .collect();

        Ok(PollOutcome { items, new_cursor })
    }

    fn backfill(
        &self,
        source: &Source,
        horizon_days: u32,
    ) -> BoxStream<'static, Result<RawNews, AdapterError>> {
        let horizon_days = clamp_horizon(horizon_days);
        let url = format!("{}/history", source.base_locator.trim_end_matches('/'));
        let client = self.client.clone();
        let source_id = source.id;

        stream::once(async move {
            let response = client
                .get(&url)
                .query(&[("days", horizon_days.to_string())])
                .send()
                .await
                .map_err(|e| AdapterError::Transient(e.to_string()))?;

            let page: ChannelPage = response
                .json()
                .await
                .map_err(|e| AdapterError::MalformedItem(e.to_string()))?;

            Ok::<_, AdapterError>(
                page.items
                    .into_iter()
                    .map(|item| Ok(item.into_raw_news(source_id)))
                    .collect::<Vec<_>>(),
            )
        })
        .flat_map(|result| match result {
            Ok(items) => stream::iter(items).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
    }
}
