use sqlx::PgPool;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::errors::AppError;
use crate::external::{SecuritiesMasterClient, SecurityMatch};
use crate::models::{AliasOrigin, LinkMethod};
use crate::services::alias_cache::AliasCache;

const LEGAL_FORM_SUFFIXES: &[&str] = &["пао", "ооо", "ао", "зао", "nlp", "group", "plc", "inc", "ltd"];

/// Minimum `match_score` for a securities-master hit to be auto-learned as a
/// new alias rather than discarded as too uncertain (spec.md §4.5 step 4).
pub const AUTO_LEARN_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LinkResult {
    pub issuer_id: uuid::Uuid,
    pub method: LinkMethod,
    pub score: f64,
}

/// Normalizes a free-text organisation mention: lower-case, strip legal-form
/// suffixes, remove punctuation, fold quotes/diacritics (spec.md §4.5 step 1).
pub fn normalize(raw_text: &str) -> String {
    let folded: String = raw_text.nfkd().filter(|c| !c.is_mark_nonspacing()).collect();
    let lower = folded.to_lowercase();
    let stripped: String = lower
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut words: Vec<&str> = stripped.split_whitespace().collect();
    words.retain(|w| !LEGAL_FORM_SUFFIXES.contains(w));
    words.join(" ")
}

trait NonSpacingMark {
    fn is_mark_nonspacing(&self) -> bool;
}

impl NonSpacingMark for char {
    fn is_mark_nonspacing(&self) -> bool {
        matches!(*self, '\u{0300}'..='\u{036f}')
    }
}

/// Resolves a free-text organisation mention to an Issuer (spec.md §4.5).
pub async fn link(
    pool: &PgPool,
    alias_cache: &AliasCache,
    securities_master: &dyn SecuritiesMasterClient,
    raw_text: &str,
) -> Result<Option<LinkResult>, AppError> {
    let normalized = normalize(raw_text);
    if normalized.is_empty() {
        return Ok(None);
    }

    if let Some((issuer_id, origin, confidence)) = alias_cache.lookup(&normalized) {
        let method = match origin {
            AliasOrigin::Curated => LinkMethod::AliasExact,
            AliasOrigin::Learned => LinkMethod::AutoLearned,
        };
        return Ok(Some(LinkResult { issuer_id, method, score: confidence }));
    }

    let matches = securities_master.search(&normalized).await.map_err(|e| {
        warn!(error = %e, query = %normalized, "securities master lookup failed");
        AppError::DownstreamFailure(e.to_string())
    })?;

    let best = pick_best_match(&normalized, &matches);

    let Some((security, total_score)) = best else {
        return Ok(None);
    };

    if total_score < AUTO_LEARN_THRESHOLD {
        return Ok(None);
    }

    let issuer_id = crate::db::issuer_queries::upsert_from_security_match(pool, &security).await?;
    alias_cache.learn(pool, &normalized, issuer_id, total_score).await?;

    info!(issuer_id = %issuer_id, alias = %normalized, score = total_score, "learned new alias");

    Ok(Some(LinkResult { issuer_id, method: LinkMethod::Fuzzy, score: total_score }))
}

/// Scores candidates by name similarity (+50), traded status (+20), equity
/// market (+15), primary board (+10), ISIN presence (+25); argmax with
/// tie-break = shorter name (spec.md §4.5 step 3).
pub fn pick_best_match(query: &str, matches: &[SecurityMatch]) -> Option<(SecurityMatch, f64)> {
    matches
        .iter()
        .map(|m| (m.clone(), match_score(query, m)))
        .max_by(|(a, a_score), (b, b_score)| {
            a_score
                .partial_cmp(b_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.name.len().cmp(&a.name.len()))
        })
}

pub fn match_score(query: &str, candidate: &SecurityMatch) -> f64 {
    let mut score = name_similarity(query, &candidate.shortname).max(name_similarity(query, &candidate.name)) * 50.0;
    if candidate.is_traded {
        score += 20.0;
    }
    if candidate.market.eq_ignore_ascii_case("equity") {
        score += 15.0;
    }
    if candidate.board.as_deref() == Some("primary") {
        score += 10.0;
    }
    if candidate.isin.is_some() {
        score += 25.0;
    }
    score
}

/// Token-overlap similarity in `[0, 1]`, good enough to rank normalized
/// organisation names without pulling in a dedicated string-distance crate.
fn name_similarity(query: &str, candidate: &str) -> f64 {
    let candidate_norm = normalize(candidate);
    if candidate_norm.is_empty() {
        return 0.0;
    }
    if candidate_norm == query {
        return 1.0;
    }

    let query_tokens: std::collections::HashSet<&str> = query.split_whitespace().collect();
    let candidate_tokens: std::collections::HashSet<&str> = candidate_norm.split_whitespace().collect();
    if query_tokens.is_empty() || candidate_tokens.is_empty() {
        return 0.0;
    }

    let overlap = query_tokens.intersection(&candidate_tokens).count();
    overlap as f64 / query_tokens.len().max(candidate_tokens.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_legal_form_and_folds_case() {
        assert_eq!(normalize("ПАО Лукойл"), "лукойл");
        assert_eq!(normalize("ООО \"Рога и Копыта\""), "рога и копыта");
    }

    #[test]
    fn match_score_rewards_traded_equity_with_isin() {
        let candidate = SecurityMatch {
            secid: "LKOH".to_string(),
            isin: Some("RU0009024277".to_string()),
            shortname: "Лукойл".to_string(),
            name: "Лукойл".to_string(),
            is_traded: true,
            market: "equity".to_string(),
            board: Some("primary".to_string()),
        };
        let score = match_score("лукойл", &candidate);
        assert_eq!(score, 50.0 + 20.0 + 15.0 + 10.0 + 25.0);
    }

    #[test]
    fn pick_best_match_prefers_higher_score() {
        let weak = SecurityMatch {
            secid: "X".to_string(),
            isin: None,
            shortname: "лукойл торг".to_string(),
            name: "лукойл торг".to_string(),
            is_traded: false,
            market: "bond".to_string(),
            board: None,
        };
        let strong = SecurityMatch {
            secid: "LKOH".to_string(),
            isin: Some("RU0009024277".to_string()),
            shortname: "лукойл".to_string(),
            name: "лукойл".to_string(),
            is_traded: true,
            market: "equity".to_string(),
            board: Some("primary".to_string()),
        };
        let (best, _) = pick_best_match("лукойл", &[weak, strong.clone()]).unwrap();
        assert_eq!(best.secid, strong.secid);
    }
}
