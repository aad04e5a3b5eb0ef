use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::{antispam_threshold, AntispamConfig, AntispamRuleKind};
use crate::models::RawNews;

/// Outcome of scoring one RawNews against the configured rule set
/// (spec.md §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct AntispamResult {
    pub score: f64,
    pub is_ad: bool,
    pub reasons: Vec<String>,
}

/// Stateless rule-weighted antispam scorer. Whitelisted domains cancel all
/// URL-shape rules for that item (spec.md §4.2).
pub fn score(
    raw: &RawNews,
    whitelisted_domains: &[String],
    trust_level: i16,
    cfg: &AntispamConfig,
) -> AntispamResult {
    let combined = format!("{} {}", raw.title, raw.text);
    let lower = combined.to_lowercase();

    let whitelisted = raw
        .url
        .as_deref()
        .map(|u| whitelisted_domains.iter().any(|d| u.contains(d.as_str())))
        .unwrap_or(false);

    let mut score = 0.0;
    let mut reasons = Vec::new();

    for rule in &cfg.rules {
        let is_url_rule = matches!(rule.kind, AntispamRuleKind::UrlShape { .. });
        if whitelisted && is_url_rule {
            continue;
        }

        if rule_fires(rule, &lower, raw) {
            score += rule.weight;
            reasons.push(rule.id.clone());
        }
    }

    let threshold = antispam_threshold(cfg, trust_level);
    let is_ad = score >= threshold;

    AntispamResult { score, is_ad, reasons }
}

fn rule_fires(rule: &crate::config::AntispamRuleConfig, lower_text: &str, raw: &RawNews) -> bool {
    match &rule.kind {
        AntispamRuleKind::Hashtag { pattern } => compiled(pattern).is_match(lower_text),
        AntispamRuleKind::Keyword { pattern } => compiled(pattern).is_match(lower_text),
        AntispamRuleKind::UrlShape { deny_tlds, shorteners } => raw.url.as_deref().is_some_and(|u| {
            let u_lower = u.to_lowercase();
            deny_tlds.iter().any(|tld| u_lower.ends_with(tld.as_str()))
                || shorteners.iter().any(|s| u_lower.contains(s.as_str()))
        }),
        AntispamRuleKind::LinkCount { min_links } => {
            raw.media_refs.len() + count_links(&raw.text) >= *min_links
        }
        AntispamRuleKind::ForwardIndicator => {
            lower_text.contains("переслано") || lower_text.contains("forwarded")
        }
        AntispamRuleKind::TitleToLinkRatio { max_ratio } => {
            let link_count = count_links(&raw.text).max(1) as f64;
            let ratio = raw.title.chars().count() as f64 / link_count;
            ratio <= *max_ratio
        }
    }
}

fn count_links(text: &str) -> usize {
    text.matches("http://").count() + text.matches("https://").count()
}

/// Regex rules are compiled once per process and cached for the lifetime of
/// the program, since `cfg.rules` is loaded once at startup and never
/// hot-reloaded (spec.md §6.7/SPEC_FULL §4 C2 note).
fn compiled(pattern: &str) -> Regex {
    static CACHE: OnceCell<dashmap::DashMap<String, Regex>> = OnceCell::new();
    let cache = CACHE.get_or_init(dashmap::DashMap::new);
    if let Some(re) = cache.get(pattern) {
        return re.clone();
    }
    let re = Regex::new(pattern).unwrap_or_else(|_| Regex::new(&regex::escape(pattern)).unwrap());
    cache.insert(pattern.to_string(), re.clone());
    re
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AntispamRuleConfig;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_cfg() -> AntispamConfig {
        AntispamConfig {
            threshold_default: 5.0,
            threshold_trusted: 8.0,
            trusted_level: 7,
            rules: vec![
                AntispamRuleConfig {
                    id: "promo_keyword".to_string(),
                    weight: 4.0,
                    kind: AntispamRuleKind::Keyword { pattern: "скидка".to_string() },
                },
                AntispamRuleConfig {
                    id: "buy_keyword".to_string(),
                    weight: 3.0,
                    kind: AntispamRuleKind::Keyword { pattern: "купи".to_string() },
                },
            ],
        }
    }

    fn sample_raw(title: &str, text: &str) -> RawNews {
        RawNews {
            source_id: Uuid::new_v4(),
            external_id: "1".to_string(),
            title: title.to_string(),
            text: text.to_string(),
            summary: None,
            published_at: Utc::now(),
            url: None,
            media_refs: vec![],
            raw_meta: serde_json::json!({}),
        }
    }

    #[test]
    fn promotional_text_scores_above_threshold() {
        let raw = sample_raw("Купи акции!", "Купи акции! Скидка 50%! @promo");
        let result = score(&raw, &[], 5, &sample_cfg());
        assert!(result.is_ad);
        assert!(result.score >= 5.0);
        assert_eq!(result.reasons, vec!["promo_keyword", "buy_keyword"]);
    }

    #[test]
    fn plain_news_does_not_score_as_ad() {
        let raw = sample_raw("ЦБ повысил ставку", "Банк России повысил ключевую ставку до 16%");
        let result = score(&raw, &[], 5, &sample_cfg());
        assert!(!result.is_ad);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn trusted_source_has_higher_threshold() {
        let cfg = sample_cfg();
        let raw = sample_raw("Купи акции!", "Купи акции! Скидка 50%!");
        let untrusted = score(&raw, &[], 5, &cfg);
        let trusted = score(&raw, &[], 9, &cfg);
        assert_eq!(untrusted.score, trusted.score);
        assert!(untrusted.is_ad);
        assert!(!trusted.is_ad);
    }
}
