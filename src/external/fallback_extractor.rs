use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::extractor::{ExtractedCompany, Extraction, Extractor, ExtractorError, Urgency};

/// Deterministic keyword-matching stand-in for the LLM-based extractor,
/// explicitly allowed by spec.md §6.2 ("a local fallback implementation MAY
/// be substituted"). Used as the default extractor and in tests, since this
/// exercise has no LLM backend to call.
pub struct FallbackExtractor;

const ORG_MARKERS: &[&str] = &["ПАО", "ООО", "АО", "ЗАО", "Группа"];

const EVENT_KEYWORDS: &[(&str, &str)] = &[
    ("санкци", "sanctions"),
    ("ключев", "rate_change"),
    ("повысил ставку", "rate_hike"),
    ("снизил ставку", "rate_cut"),
    ("прибыл", "earnings"),
    ("убыт", "earnings_miss"),
    ("прогноз", "guidance"),
    ("слияни", "mna"),
    ("поглощени", "mna"),
    ("ipo", "ipo"),
    ("дивиденд", "dividends"),
    ("buyback", "buyback"),
    ("обратный выкуп", "buyback"),
    ("дефолт", "default"),
    ("отставк", "management_change"),
    ("назначен", "management_change"),
    ("поставк", "supply_chain"),
    ("авари", "accident"),
    ("забастовк", "strike"),
    ("суд", "legal"),
    ("упали", "stock_drop"),
    ("выросли", "stock_rally"),
    ("укрепил", "rub_appreciation"),
    ("ослаб", "rub_depreciation"),
];

#[async_trait]
impl Extractor for FallbackExtractor {
    async fn extract(
        &self,
        text: &str,
        title: &str,
        _published_at: DateTime<Utc>,
        lang: &str,
    ) -> Result<Extraction, ExtractorError> {
        let combined = format!("{title} {text}");
        let lower = combined.to_lowercase();

        let event_types: Vec<String> = EVENT_KEYWORDS
            .iter()
            .filter(|(kw, _)| lower.contains(kw))
            .map(|(_, ty)| ty.to_string())
            .collect();

        let companies = extract_companies(&combined);

        let is_advertisement = lower.contains("купи") || lower.contains("скидка") || lower.contains("промокод");

        let confidence = if event_types.is_empty() { 0.2 } else { 0.75 };

        Ok(Extraction {
            companies,
            people: Vec::new(),
            markets: Vec::new(),
            financial_metrics: Vec::new(),
            event_types,
            sector: None,
            country: if lang == "ru" { Some("RU".to_string()) } else { None },
            is_anchor: None,
            urgency: Urgency::Normal,
            confidence,
            is_advertisement,
            content_types: Vec::new(),
        })
    }
}

fn extract_companies(text: &str) -> Vec<ExtractedCompany> {
    let mut found = Vec::new();
    for marker in ORG_MARKERS {
        if let Some(idx) = text.find(marker) {
            let window: String = text[idx..].chars().take(40).collect();
            let raw_text = window
                .split(|c: char| c == '.' || c == ',' || c == '\n')
                .next()
                .unwrap_or(&window)
                .trim()
                .to_string();
            if !raw_text.is_empty() {
                found.push(ExtractedCompany { raw_text, confidence: 0.6 });
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_rate_hike_and_org() {
        let extractor = FallbackExtractor;
        let extraction = extractor
            .extract(
                "Банк России повысил ключевую ставку до 16%",
                "ЦБ повысил ставку",
                Utc::now(),
                "ru",
            )
            .await
            .unwrap();

        assert!(extraction.event_types.contains(&"rate_hike".to_string()));
        assert!(!extraction.is_advertisement);
    }

    #[tokio::test]
    async fn flags_promotional_text_as_advertisement() {
        let extractor = FallbackExtractor;
        let extraction = extractor
            .extract("Купи акции! Скидка 50%! @promo", "Купи акции!", Utc::now(), "ru")
            .await
            .unwrap();

        assert!(extraction.is_advertisement);
    }
}
