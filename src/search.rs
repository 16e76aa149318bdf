//! Match scoring and ranking across local and remote entries.
//!
//! The scoring ladder is fixed; only the fuzzy cut-off and the minimum score
//! are tunable through [`SearchConfig`](crate::config::SearchConfig).
//!
//! # Scoring
//!
//! | Match | Score |
//! |-------|-------|
//! | exact name | 1.0 |
//! | name prefix | 0.8 |
//! | name substring | 0.6 |
//! | fuzzy name (opt-in) | `0.5 × similarity`, in (0, 0.5] |
//! | description contains query | 0.3 |
//!
//! The first three are tried in order. When none applies, the better of the
//! fuzzy and description matches wins. Fuzzy similarity is
//! `strsim::normalized_levenshtein` of the query against the full name and
//! against each name token, keeping the best.
//!
//! # Ordering
//!
//! Score (desc), then source (local first), then normalized name (asc), then
//! element type. Truncated to `max_results`.

use std::cmp::Ordering;

use crate::models::{IndexEntry, MatchType, SearchResult};

pub const EXACT_SCORE: f64 = 1.0;
pub const PREFIX_SCORE: f64 = 0.8;
pub const SUBSTRING_SCORE: f64 = 0.6;
pub const FUZZY_MAX_SCORE: f64 = 0.5;
pub const DESCRIPTION_SCORE: f64 = 0.3;

/// Tuning for a single ranking pass.
#[derive(Debug, Clone)]
pub struct RankParams {
    pub max_results: usize,
    pub min_score: f64,
    /// `Some(threshold)` enables fuzzy matching.
    pub fuzzy_threshold: Option<f64>,
}

/// Score one entry against an already-normalized query.
pub fn score_entry(
    query: &str,
    entry: &IndexEntry,
    fuzzy_threshold: Option<f64>,
) -> Option<(MatchType, f64)> {
    let name = entry.normalized_name();

    if name == query {
        return Some((MatchType::Exact, EXACT_SCORE));
    }
    if name.starts_with(query) {
        return Some((MatchType::Prefix, PREFIX_SCORE));
    }
    if name.contains(query) {
        return Some((MatchType::Substring, SUBSTRING_SCORE));
    }

    let fuzzy = fuzzy_threshold.and_then(|threshold| {
        let similarity = fuzzy_similarity(query, &name);
        (similarity > 0.0 && similarity >= threshold)
            .then_some((MatchType::Fuzzy, FUZZY_MAX_SCORE * similarity))
    });
    let description = entry
        .normalized_description
        .contains(query)
        .then_some((MatchType::Description, DESCRIPTION_SCORE));

    match (fuzzy, description) {
        (Some(f), Some(d)) => Some(if f.1 >= d.1 { f } else { d }),
        (f, d) => f.or(d),
    }
}

/// Best normalized Levenshtein similarity of `query` against `name` and its
/// tokens. In `[0, 1]`.
pub fn fuzzy_similarity(query: &str, name: &str) -> f64 {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|token| !token.is_empty())
        .map(|token| strsim::normalized_levenshtein(query, token))
        .fold(strsim::normalized_levenshtein(query, name), f64::max)
}

/// Score, filter, sort, and truncate candidates.
pub fn rank<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = &'a IndexEntry>,
    params: &RankParams,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|entry| {
            let (match_type, score) = score_entry(query, entry, params.fuzzy_threshold)?;
            (score >= params.min_score).then(|| SearchResult {
                entry: entry.clone(),
                match_type,
                score,
            })
        })
        .collect();

    results.sort_by(compare_results);
    results.truncate(params.max_results);
    results
}

fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.entry.source.cmp(&b.entry.source))
        .then_with(|| a.entry.normalized_name().cmp(&b.entry.normalized_name()))
        .then(a.entry.element_type.cmp(&b.entry.element_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementType, Source};
    use chrono::Utc;

    fn entry(name: &str, description: &str, source: Source) -> IndexEntry {
        IndexEntry::new(ElementType::Persona, name, description, source, Utc::now())
    }

    fn params(fuzzy: bool) -> RankParams {
        RankParams {
            max_results: 10,
            min_score: 0.1,
            fuzzy_threshold: fuzzy.then_some(0.6),
        }
    }

    #[test]
    fn test_score_ladder() {
        let q = "alice";
        assert_eq!(
            score_entry(q, &entry("Alice", "", Source::Local), None),
            Some((MatchType::Exact, 1.0))
        );
        assert_eq!(
            score_entry(q, &entry("alice-helper", "", Source::Local), None),
            Some((MatchType::Prefix, 0.8))
        );
        assert_eq!(
            score_entry(q, &entry("Dear Alice", "", Source::Local), None),
            Some((MatchType::Substring, 0.6))
        );
        assert_eq!(
            score_entry(q, &entry("Bob", "friend of alice", Source::Local), None),
            Some((MatchType::Description, 0.3))
        );
        assert_eq!(score_entry(q, &entry("Bob", "", Source::Local), None), None);
    }

    #[test]
    fn test_description_tier_ignores_type_and_name() {
        let alice = entry("Alice", "A friendly assistant", Source::Local);
        assert_eq!(score_entry("persona", &alice, None), None);
        assert_eq!(score_entry("alice a friendly", &alice, None), None);
        assert_eq!(
            score_entry("friendly assistant", &alice, None),
            Some((MatchType::Description, DESCRIPTION_SCORE))
        );
    }

    #[test]
    fn test_fuzzy_only_when_enabled() {
        let typo = entry("alicia", "", Source::Local);
        assert_eq!(score_entry("alice", &typo, None), None);

        let (match_type, score) = score_entry("alice", &typo, Some(0.6)).unwrap();
        assert_eq!(match_type, MatchType::Fuzzy);
        assert!(score > 0.0 && score <= FUZZY_MAX_SCORE);
    }

    #[test]
    fn test_fuzzy_matches_tokens() {
        let sim = fuzzy_similarity("reviwer", "code-reviewer");
        assert!(sim > 0.8, "similarity {}", sim);
    }

    #[test]
    fn test_fuzzy_below_threshold_falls_back_to_description() {
        let e = entry("zzzz", "about alice", Source::Local);
        assert_eq!(
            score_entry("alice", &e, Some(0.6)),
            Some((MatchType::Description, DESCRIPTION_SCORE))
        );
    }

    #[test]
    fn test_rank_orders_by_score_then_source_then_name() {
        let entries = vec![
            entry("alice-zed", "", Source::Remote),
            entry("alice-amy", "", Source::Remote),
            entry("alice-bob", "", Source::Local),
            entry("Alice", "", Source::Remote),
            entry("Alice", "", Source::Local),
        ];
        let results = rank("alice", &entries, &params(false));
        let got: Vec<(String, Source)> = results
            .iter()
            .map(|r| (r.entry.name.clone(), r.entry.source))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Alice".to_string(), Source::Local),
                ("Alice".to_string(), Source::Remote),
                ("alice-bob".to_string(), Source::Local),
                ("alice-amy".to_string(), Source::Remote),
                ("alice-zed".to_string(), Source::Remote),
            ]
        );
    }

    #[test]
    fn test_rank_applies_min_score_and_limit() {
        let entries = vec![
            entry("alice", "", Source::Local),
            entry("alice-2", "", Source::Local),
            entry("bob", "knows alice", Source::Local),
        ];
        let strict = RankParams {
            max_results: 10,
            min_score: 0.5,
            fuzzy_threshold: None,
        };
        assert_eq!(rank("alice", &entries, &strict).len(), 2);

        let limited = RankParams {
            max_results: 1,
            ..params(false)
        };
        let results = rank("alice", &entries, &limited);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Exact);
    }

    #[test]
    fn test_scores_non_increasing() {
        let entries: Vec<IndexEntry> = ["alice", "alicia", "malice", "alice-x", "bob"]
            .iter()
            .map(|n| entry(n, "alice notes", Source::Local))
            .collect();
        let results = rank("alice", &entries, &params(true));
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for r in &results {
            assert!((0.0..=1.0).contains(&r.score));
        }
    }
}
