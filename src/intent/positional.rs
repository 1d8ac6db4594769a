//! Positional entity extraction: boundary-pair span search.
//!
//! For one placeholder, a left and a right [`EdgeClassifier`] score every
//! token position of a candidate sentence. Every sufficiently confident
//! (left, right) pair that does not touch an already extracted span
//! produces a new candidate with the span substituted by the placeholder
//! token. Candidates multiply out across an intent's placeholders; the
//! whole-sentence classifier settles the winner afterwards.

use std::path::Path;

use crate::corpus::TrainingCorpus;
use crate::entity::Entity;
use crate::error::Result;
use crate::intent::edge::{EdgeClassifier, EdgeSide};
use crate::matching::MatchCandidate;
use crate::util::append_suffix;

/// Boundary scores below this are not worth pairing up.
const SCORE_THRESHOLD: f64 = 0.05;

/// Per-placeholder extractor: a trained boundary classifier pair.
#[derive(Debug)]
pub struct PositionalExtractor {
    token: String,
    left: EdgeClassifier,
    right: EdgeClassifier,
}

impl PositionalExtractor {
    /// Create an untrained extractor for a placeholder token.
    pub fn new(token: &str) -> Self {
        PositionalExtractor {
            token: token.to_string(),
            left: EdgeClassifier::new(token, EdgeSide::Left),
            right: EdgeClassifier::new(token, EdgeSide::Right),
        }
    }

    /// The placeholder token this extractor attaches to.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Train both boundary classifiers.
    pub fn train(&mut self, name: &str, corpus: &TrainingCorpus) -> Result<()> {
        self.left.train(name, corpus)?;
        self.right.train(name, corpus)?;
        Ok(())
    }

    /// Expand a partial candidate with every plausible span for this
    /// placeholder. The input candidate itself is not returned; callers
    /// keep it in their pool so skipping the placeholder stays possible.
    ///
    /// When an [`Entity`] is registered for the placeholder, its
    /// classifier re-scores the extracted span text and biases candidate
    /// selection through the accumulated confidence.
    pub fn expand(&self, candidate: &MatchCandidate, entity: Option<&Entity>) -> Vec<MatchCandidate> {
        let sent = &candidate.sent;

        let left_scores: Vec<f64> = (0..sent.len()).map(|p| self.left.score(sent, p)).collect();
        let right_scores: Vec<f64> = (0..sent.len()).map(|p| self.right.score(sent, p)).collect();

        let mut expansions = Vec::new();
        for (l_pos, &l_conf) in left_scores.iter().enumerate() {
            if l_conf < SCORE_THRESHOLD {
                continue;
            }
            for (r_pos, &r_conf) in right_scores.iter().enumerate() {
                if r_conf < SCORE_THRESHOLD || r_pos < l_pos {
                    continue;
                }
                // Spans never overlap a previously extracted placeholder.
                if sent[l_pos..=r_pos].iter().any(|t| t.starts_with('{')) {
                    continue;
                }

                let span = sent[l_pos..=r_pos].to_vec();
                let mut extra_conf = ((l_conf - 0.5) + (r_conf - 0.5)) / 2.0;
                if let Some(entity) = entity {
                    extra_conf += entity.score(&span) - 0.5;
                }

                let mut new_sent = Vec::with_capacity(sent.len() - span.len() + 1);
                new_sent.extend_from_slice(&sent[..l_pos]);
                new_sent.push(self.token.clone());
                new_sent.extend_from_slice(&sent[r_pos + 1..]);

                let mut new_matches = candidate.matches.clone();
                new_matches.insert(self.token.clone(), span);

                expansions.push(MatchCandidate {
                    sent: new_sent,
                    matches: new_matches,
                    conf: candidate.conf + extra_conf,
                });
            }
        }
        expansions
    }

    /// Persist both edges under `prefix.{token}.*`.
    pub fn save(&self, prefix: &Path) -> Result<()> {
        let prefix = append_suffix(prefix, &format!(".{}", self.token));
        self.left.save(&prefix)?;
        self.right.save(&prefix)?;
        Ok(())
    }

    /// Load a previously persisted extractor.
    pub fn load(token: &str, prefix: &Path) -> Result<Self> {
        let prefix = append_suffix(prefix, &format!(".{token}"));
        Ok(PositionalExtractor {
            token: token.to_string(),
            left: EdgeClassifier::load(token, EdgeSide::Left, &prefix)?,
            right: EdgeClassifier::load(token, EdgeSide::Right, &prefix)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenize;

    fn corpus() -> TrainingCorpus {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines(
            "drive",
            &["drive to {place}".to_string(), "drive me to {place}".to_string()],
        );
        corpus.add_lines("swim", &["swim to {island}".to_string()]);
        corpus
    }

    #[test]
    fn test_expand_finds_trailing_span() {
        let corpus = corpus();
        let mut extractor = PositionalExtractor::new("{place}");
        extractor.train("drive", &corpus).unwrap();

        let seed = MatchCandidate::new(tokenize("drive to the lake"));
        let expansions = extractor.expand(&seed, None);
        assert!(!expansions.is_empty());

        let best = expansions
            .iter()
            .max_by(|a, b| a.conf.partial_cmp(&b.conf).unwrap())
            .unwrap();
        assert_eq!(best.sent, tokenize("drive to {place}"));
        assert_eq!(
            best.matches.get("{place}"),
            Some(&tokenize("the lake"))
        );
    }

    #[test]
    fn test_expand_never_overlaps_extracted_spans() {
        let corpus = corpus();
        let mut extractor = PositionalExtractor::new("{place}");
        extractor.train("drive", &corpus).unwrap();

        // A candidate where another placeholder already consumed a span.
        let seed = MatchCandidate::new(tokenize("drive to {other} lake"));
        for candidate in extractor.expand(&seed, None) {
            let span = &candidate.matches["{place}"];
            assert!(
                !span.iter().any(|t| t.starts_with('{')),
                "span {span:?} overlaps a consumed placeholder"
            );
        }
    }

    #[test]
    fn test_untrained_expands_nothing() {
        let extractor = PositionalExtractor::new("{place}");
        let seed = MatchCandidate::new(tokenize("drive to the lake"));
        assert!(extractor.expand(&seed, None).is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("drive.pos");

        let corpus = corpus();
        let mut extractor = PositionalExtractor::new("{place}");
        extractor.train("drive", &corpus).unwrap();
        extractor.save(&prefix).unwrap();

        let reloaded = PositionalExtractor::load("{place}", &prefix).unwrap();
        let seed = MatchCandidate::new(tokenize("drive to the lake"));
        let before = extractor.expand(&seed, None);
        let after = reloaded.expand(&seed, None);
        assert_eq!(before.len(), after.len());
    }
}
