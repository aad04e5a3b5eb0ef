use chrono::{DateTime, Utc};

use crate::external::Extraction;
use crate::models::{EventAttrs, EventType, LinkedCompany, NewEvent};

const MAX_EVENTS_PER_NEWS: usize = 5;
const ANCHOR_CONFIDENCE_FLOOR: f64 = 0.7;
const ANCHOR_TRUST_FLOOR: i16 = 7;

/// Builds typed events from an enrichment record (spec.md §4.7). One News
/// yields between 0 and `max_events_per_news` events, most-confident event
/// types first.
pub fn extract_events(
    title: &str,
    text: &str,
    published_at: DateTime<Utc>,
    extraction: &Extraction,
    linked_companies: &[(LinkedCompany, String)],
    source_trust_level: i16,
    max_events_per_news: usize,
) -> Vec<NewEvent> {
    let cap = max_events_per_news.min(MAX_EVENTS_PER_NEWS);
    let tickers: Vec<String> = linked_companies.iter().map(|(_, ticker)| ticker.clone()).collect();
    let companies: Vec<String> = extraction.companies.iter().map(|c| c.raw_text.clone()).collect();

    extraction
        .event_types
        .iter()
        .filter_map(|raw_type| parse_event_type(raw_type))
        .take(cap)
        .map(|event_type| {
            let event_title = first_sentence_with_keyword(title, text, raw_type_keyword(event_type))
                .unwrap_or_else(|| title.to_string());

            let confidence = extraction.confidence;
            let is_anchor = EventType::anchor_eligible_default().contains(&event_type)
                && confidence >= ANCHOR_CONFIDENCE_FLOOR
                && source_trust_level >= ANCHOR_TRUST_FLOOR;

            NewEvent {
                r#type: event_type,
                title: event_title,
                ts: published_at,
                attrs: EventAttrs {
                    companies: companies.clone(),
                    tickers: tickers.clone(),
                    people: extraction.people.clone(),
                    markets: extraction.markets.clone(),
                    metrics: extraction.financial_metrics.clone(),
                },
                is_anchor,
                confidence,
            }
        })
        .collect()
}

fn parse_event_type(raw: &str) -> Option<EventType> {
    use EventType::*;
    Some(match raw {
        "sanctions" => Sanctions,
        "rate_hike" => RateHike,
        "rate_cut" => RateCut,
        "rate_change" => RateHike,
        "earnings" => Earnings,
        "earnings_beat" => EarningsBeat,
        "earnings_miss" => EarningsMiss,
        "guidance" => Guidance,
        "guidance_cut" => GuidanceCut,
        "mna" => Mna,
        "ipo" => Ipo,
        "dividends" => Dividends,
        "dividend_cut" => DividendCut,
        "buyback" => Buyback,
        "default" => Default,
        "management_change" => ManagementChange,
        "supply_chain" => SupplyChain,
        "production" => Production,
        "accident" => Accident,
        "strike" => Strike,
        "legal" => Legal,
        "stock_drop" => StockDrop,
        "stock_rally" => StockRally,
        "rub_appreciation" => RubAppreciation,
        "rub_depreciation" => RubDepreciation,
        _ => return None,
    })
}

fn raw_type_keyword(event_type: EventType) -> &'static str {
    use EventType::*;
    match event_type {
        Sanctions => "санкц",
        RateHike => "повысил ставку",
        RateCut => "снизил ставку",
        Earnings | EarningsBeat | EarningsMiss => "прибыл",
        Guidance | GuidanceCut => "прогноз",
        Mna => "слияни",
        Ipo => "ipo",
        Dividends | DividendCut => "дивиденд",
        Buyback => "выкуп",
        Default => "дефолт",
        ManagementChange => "отставк",
        SupplyChain | Production => "поставк",
        Accident => "авари",
        Strike => "забастовк",
        Legal => "суд",
        StockDrop => "упали",
        StockRally => "выросли",
        RubAppreciation => "укрепил",
        RubDepreciation => "ослаб",
        Other => "",
    }
}

/// First sentence in `title`/`text` containing the type's keyword, falling
/// back to the caller-supplied title when none matches (spec.md §4.7).
fn first_sentence_with_keyword(title: &str, text: &str, keyword: &str) -> Option<String> {
    if keyword.is_empty() {
        return None;
    }
    let title_lower = title.to_lowercase();
    if title_lower.contains(keyword) {
        return Some(title.to_string());
    }

    text.split(['.', '!', '?'])
        .map(str::trim)
        .find(|sentence| sentence.to_lowercase().contains(keyword))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ExtractedCompany;

    fn extraction_with(event_types: &[&str]) -> Extraction {
        Extraction {
            companies: vec![ExtractedCompany { raw_text: "Банк России".to_string(), confidence: 0.8 }],
            event_types: event_types.iter().map(|s| s.to_string()).collect(),
            confidence: 0.9,
            ..Extraction::default()
        }
    }

    #[test]
    fn extracts_rate_hike_event_with_anchor_flag() {
        let extraction = extraction_with(&["rate_hike"]);
        let events = extract_events(
            "ЦБ повысил ставку",
            "Банк России повысил ключевую ставку до 16%",
            Utc::now(),
            &extraction,
            &[],
            8,
            5,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].r#type, EventType::RateHike);
        assert!(events[0].is_anchor);
    }

    #[test]
    fn caps_at_max_events_per_news() {
        let extraction = extraction_with(&["sanctions", "rate_hike", "earnings", "mna", "ipo", "dividends"]);
        let events = extract_events("t", "мы говорим о многом", Utc::now(), &extraction, &[], 5, 5);
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn low_trust_source_never_anchors() {
        let extraction = extraction_with(&["sanctions"]);
        let events = extract_events("Санкции введены", "текст про санкции", Utc::now(), &extraction, &[], 3, 5);
        assert!(!events[0].is_anchor);
    }
}
