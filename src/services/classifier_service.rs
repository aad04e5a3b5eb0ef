use crate::external::Extraction;
use crate::models::{Classification, NewsSubtype, NewsType, Topic};

const SECTOR_KEYWORDS: &[(&str, &str)] = &[
    ("банк", "financials"),
    ("нефт", "energy"),
    ("газ", "energy"),
    ("металл", "materials"),
    ("ритейл", "consumer"),
    ("телеком", "telecom"),
    ("строит", "industrials"),
];

const COUNTRY_KEYWORDS: &[(&str, &str)] = &[
    ("росси", "RU"),
    ("сша", "US"),
    ("китай", "CN"),
    ("евросоюз", "EU"),
];

const SECONDARY_TAG_KEYWORDS: &[(&str, &str)] = &[
    ("дивиденд", "dividends"),
    ("ai", "ai"),
    ("квартал", "quarterly"),
    ("экспорт", "export"),
];

/// Deterministic keyword/lexicon classifier (spec.md §4.6). Does not call
/// out to anything external; the extraction record and the linked-issuer
/// sector (if any) are the only inputs.
pub fn classify(
    news_id: uuid::Uuid,
    title: &str,
    text: &str,
    lang: &str,
    extraction: &Extraction,
    linked_issuer_sector: Option<&str>,
    linked_company_count: usize,
) -> Classification {
    let combined = format!("{title} {text}").to_lowercase();

    let sector_code = linked_issuer_sector
        .map(str::to_string)
        .or_else(|| keyword_lookup(&combined, SECTOR_KEYWORDS));

    let country_code = extraction
        .country
        .clone()
        .or_else(|| keyword_lookup(&combined, COUNTRY_KEYWORDS))
        .or_else(|| if lang == "ru" { Some("RU".to_string()) } else { None });

    let news_type = if extraction.event_types.iter().any(|t| t == "sanctions" || t == "rate_hike" || t == "rate_cut") {
        NewsType::Regulatory
    } else if linked_company_count == 1 {
        NewsType::OneCompany
    } else {
        NewsType::Market
    };

    let news_subtype = subtype_from_event_types(&extraction.event_types);

    let secondary: Vec<&str> = SECONDARY_TAG_KEYWORDS
        .iter()
        .filter(|(kw, _)| combined.contains(kw))
        .map(|(_, tag)| *tag)
        .take(3)
        .collect();

    let mut topics: Vec<Topic> = secondary
        .iter()
        .enumerate()
        .map(|(i, tag)| Topic { news_id, code: tag.to_string(), confidence: 0.6, is_primary: i == 0 })
        .collect();
    if topics.is_empty() {
        topics.push(Topic { news_id, code: news_subtype_code(news_subtype).to_string(), confidence: 0.5, is_primary: true });
    }

    Classification { topics, sector_code, country_code, news_type, news_subtype }
}

fn keyword_lookup(text: &str, table: &[(&str, &str)]) -> Option<String> {
    table.iter().find(|(kw, _)| text.contains(kw)).map(|(_, code)| code.to_string())
}

fn subtype_from_event_types(event_types: &[String]) -> NewsSubtype {
    for ty in event_types {
        let subtype = match ty.as_str() {
            "earnings" | "earnings_beat" | "earnings_miss" => Some(NewsSubtype::Earnings),
            "guidance" | "guidance_cut" => Some(NewsSubtype::Guidance),
            "mna" => Some(NewsSubtype::MnA),
            "default" => Some(NewsSubtype::Default),
            "sanctions" => Some(NewsSubtype::Sanctions),
            "legal" => Some(NewsSubtype::Legal),
            "supply_chain" | "production" | "accident" => Some(NewsSubtype::SupplyChain),
            "management_change" => Some(NewsSubtype::ManagementChange),
            _ => None,
        };
        if let Some(subtype) = subtype {
            return subtype;
        }
    }
    NewsSubtype::Other
}

fn news_subtype_code(subtype: NewsSubtype) -> &'static str {
    match subtype {
        NewsSubtype::Earnings => "earnings",
        NewsSubtype::Guidance => "guidance",
        NewsSubtype::MnA => "mna",
        NewsSubtype::Default => "default",
        NewsSubtype::Sanctions => "sanctions",
        NewsSubtype::Hack => "hack",
        NewsSubtype::Legal => "legal",
        NewsSubtype::Esg => "esg",
        NewsSubtype::SupplyChain => "supply_chain",
        NewsSubtype::TechOutage => "tech_outage",
        NewsSubtype::ManagementChange => "management_change",
        NewsSubtype::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_extraction(event_types: &[&str]) -> Extraction {
        Extraction {
            event_types: event_types.iter().map(|s| s.to_string()).collect(),
            ..Extraction::default()
        }
    }

    #[test]
    fn sanctions_classify_as_regulatory() {
        let extraction = sample_extraction(&["sanctions"]);
        let classification = classify(
            uuid::Uuid::new_v4(),
            "США ввели санкции",
            "против российских банков",
            "ru",
            &extraction,
            None,
            0,
        );
        assert_eq!(classification.news_type, NewsType::Regulatory);
        assert_eq!(classification.news_subtype, NewsSubtype::Sanctions);
        assert_eq!(classification.country_code.as_deref(), Some("RU"));
    }

    #[test]
    fn single_linked_company_is_one_company_type() {
        let extraction = sample_extraction(&["earnings"]);
        let classification =
            classify(uuid::Uuid::new_v4(), "Отчет", "Компания отчиталась", "ru", &extraction, Some("financials"), 1);
        assert_eq!(classification.news_type, NewsType::OneCompany);
        assert_eq!(classification.sector_code.as_deref(), Some("financials"));
    }
}
