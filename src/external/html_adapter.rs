use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use scraper::{Html, Selector};
use uuid::Uuid;

use crate::models::{RawMediaRef, RawNews, Source};

use super::source_adapter::{clamp_horizon, AdapterError, PollOutcome, SourceAdapter};

/// Polls an HTML news-listing source by fetching and scraping its index page.
/// `Source.config` carries the CSS selectors for the listing (`item_selector`,
/// `title_selector`, `link_selector`, `summary_selector`) — every `html`
/// source supplies its own selector set, letting one adapter serve many
/// differently-templated outlets.
pub struct HtmlAdapter {
    client: reqwest::Client,
}

impl HtmlAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for HtmlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

struct Selectors {
    item: Selector,
    title: Selector,
    link: Selector,
    summary: Option<Selector>,
}

fn selector_from_config(source: &Source, key: &str) -> Option<String> {
    source.config.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn load_selectors(source: &Source) -> Result<Selectors, AdapterError> {
    let parse = |raw: &str| {
        Selector::parse(raw).map_err(|_| AdapterError::MalformedItem(format!("bad selector: {raw}")))
    };

    let item = selector_from_config(source, "item_selector")
        .ok_or_else(|| AdapterError::MalformedItem("missing item_selector".into()))?;
    let title = selector_from_config(source, "title_selector")
        .ok_or_else(|| AdapterError::MalformedItem("missing title_selector".into()))?;
    let link = selector_from_config(source, "link_selector")
        .ok_or_else(|| AdapterError::MalformedItem("missing link_selector".into()))?;
    let summary = selector_from_config(source, "summary_selector");

    Ok(Selectors {
        item: parse(&item)?,
        title: parse(&title)?,
        link: parse(&link)?,
        summary: summary.map(|s| parse(&s)).transpose()?,
    })
}

fn scrape(html_body: &str, selectors: &Selectors, source_id: Uuid, base_url: &str) -> Vec<RawNews> {
    let document = Html::parse_document(html_body);
    let mut out = Vec::new();

    for item in document.select(&selectors.item) {
        let title = item
            .select(&selectors.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let href = item
            .select(&selectors.link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .unwrap_or_default();
        if href.is_empty() {
            continue;
        }

        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), href)
        };

        let summary = selectors
            .summary
            .as_ref()
            .and_then(|sel| item.select(sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string());

        out.push(RawNews {
            source_id,
            external_id: url.clone(),
            title,
            text: summary.clone().unwrap_or_default(),
            summary,
            published_at: Utc::now(),
            url: Some(url),
            media_refs: Vec::<RawMediaRef>::new(),
            raw_meta: serde_json::json!({}),
        });
    }

    out
}

#[async_trait]
impl SourceAdapter for HtmlAdapter {
    async fn poll(
        &self,
        source: &Source,
        _cursor: Option<&str>,
    ) -> Result<PollOutcome, AdapterError> {
        let selectors = load_selectors(source)?;

        let response = self.client.get(&source.base_locator).send().await.map_err(|e| {
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

        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Transient(e.to_string()))?;

        let items = scrape(&body, &selectors, source.id, &source.base_locator);

        Ok(PollOutcome { items, new_cursor: None })
    }

    fn backfill(
        &self,
        source: &Source,
        horizon_days: u32,
    ) -> BoxStream<'static, Result<RawNews, AdapterError>> {
        // Listing pages are not paginated by date in general; a single poll
        // against the live index is the best this adapter can offer, so
        // backfill degrades to "whatever is currently listed".
        let _ = clamp_horizon(horizon_days);
        let client = self.client.clone();
        let source = source.clone();

        stream::once(async move {
            let selectors = load_selectors(&source)?;
            let response = client
                .get(&source.base_locator)
                .send()
                .await
                .map_err(|e| AdapterError::Transient(e.to_string()))?;
            let body = response
                .text()
                .await
                .map_err(|e| AdapterError::Transient(e.to_string()))?;
            Ok::<_, AdapterError>(scrape(&body, &selectors, source.id, &source.base_locator))
        })
        .flat_map(|result| match result {
            Ok(items) => stream::iter(items.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
    }
}
