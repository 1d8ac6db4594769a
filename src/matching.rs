//! Match candidates, final match results, and the ranking policy.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::analysis::detokenize;

/// A partial match built up during span search.
///
/// Transient: candidates exist only while an intent's positional
/// extractors expand the space of possible entity assignments.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// The current sentence with extracted spans substituted by their
    /// placeholder tokens.
    pub sent: Vec<String>,
    /// Placeholder token → extracted span tokens.
    pub matches: HashMap<String, Vec<String>>,
    /// Accumulated confidence delta from boundary scoring.
    pub conf: f64,
}

impl MatchCandidate {
    /// Seed candidate for an untouched sentence.
    pub fn new(sent: Vec<String>) -> Self {
        MatchCandidate {
            sent,
            matches: HashMap::new(),
            conf: 0.0,
        }
    }
}

/// Final description of how a query fits one intent.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Name of the matched intent. Empty for the placeholder result.
    pub name: String,
    /// The query after entity extraction, detokenized.
    pub sent: String,
    /// Entity name (braces stripped) → extracted text.
    pub matches: HashMap<String, String>,
    /// Confidence from 0.0 to 1.0.
    pub conf: f64,
}

impl MatchResult {
    /// Detokenize a finished candidate into a result for `name`.
    ///
    /// Placeholder keys lose their braces: `{place}` becomes `place`.
    pub fn from_candidate(name: &str, candidate: &MatchCandidate) -> Self {
        let matches = candidate
            .matches
            .iter()
            .map(|(token, span)| {
                let key = token.trim_matches(|c| c == '{' || c == '}').to_string();
                (key, detokenize(span))
            })
            .collect();
        MatchResult {
            name: name.to_string(),
            sent: detokenize(&candidate.sent),
            matches,
            conf: candidate.conf,
        }
    }

    /// The null-confidence result returned when nothing can match.
    pub fn placeholder() -> Self {
        MatchResult {
            name: String::new(),
            sent: String::new(),
            matches: HashMap::new(),
            conf: 0.0,
        }
    }

    /// Combined length of all extracted entity text, used as the
    /// ranking tie-breaker.
    pub fn entity_text_len(&self) -> usize {
        self.matches.values().map(String::len).sum()
    }
}

/// Ranking comparator: higher confidence first; at equal confidence the
/// match with the shortest combined extracted-entity text wins. The
/// minimal-extraction tie-break guards against over-greedy spans when
/// several intents hit 1.0 on the deterministic path. It is a policy
/// choice, kept in one place so alternatives stay cheap to try.
pub fn rank_cmp(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.conf
        .partial_cmp(&a.conf)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.entity_text_len().cmp(&b.entity_text_len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, conf: f64, entity_text: &str) -> MatchResult {
        let mut matches = HashMap::new();
        if !entity_text.is_empty() {
            matches.insert("e".to_string(), entity_text.to_string());
        }
        MatchResult {
            name: name.to_string(),
            sent: String::new(),
            matches,
            conf,
        }
    }

    #[test]
    fn test_rank_by_confidence() {
        let mut results = vec![result("low", 0.4, ""), result("high", 0.9, "")];
        results.sort_by(rank_cmp);
        assert_eq!(results[0].name, "high");
    }

    #[test]
    fn test_tie_break_shortest_entity_text() {
        let mut results = vec![
            result("greedy", 1.0, "the whole lake shore"),
            result("minimal", 1.0, "lake"),
        ];
        results.sort_by(rank_cmp);
        assert_eq!(results[0].name, "minimal");
    }

    #[test]
    fn test_from_candidate_strips_braces() {
        let mut candidate = MatchCandidate::new(vec![
            "drive".to_string(),
            "to".to_string(),
            "{place}".to_string(),
        ]);
        candidate.matches.insert(
            "{place}".to_string(),
            vec!["the".to_string(), "lake".to_string()],
        );
        candidate.conf = 0.8;

        let result = MatchResult::from_candidate("drive", &candidate);
        assert_eq!(result.sent, "drive to {place}");
        assert_eq!(result.matches.get("place").map(String::as_str), Some("the lake"));
        assert_eq!(result.conf, 0.8);
    }

    #[test]
    fn test_placeholder_result() {
        let result = MatchResult::placeholder();
        assert!(result.name.is_empty());
        assert_eq!(result.conf, 0.0);
        assert_eq!(result.entity_text_len(), 0);
    }
}
