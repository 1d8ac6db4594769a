//! Intents: a whole-sentence classifier plus positional entity extractors.

pub mod edge;
pub mod positional;
pub mod sentence;

use std::path::Path;

use crate::corpus::TrainingCorpus;
use crate::entity::EntityMap;
use crate::error::{ParlanceError, Result};
use crate::matching::MatchCandidate;
use crate::util::append_suffix;

use positional::PositionalExtractor;
use sentence::SentenceClassifier;

/// A named category of utterance: one whole-sentence classifier and one
/// positional extractor per distinct placeholder in its examples.
#[derive(Debug)]
pub struct Intent {
    name: String,
    hash: [u8; 4],
    sentence: SentenceClassifier,
    extractors: Vec<PositionalExtractor>,
}

impl Intent {
    /// Create an untrained intent stamped with its corpus hash.
    pub fn new(name: &str, hash: [u8; 4]) -> Self {
        Intent {
            name: name.to_string(),
            hash,
            sentence: SentenceClassifier::new(),
            extractors: Vec::new(),
        }
    }

    /// The intent's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content hash of the training lines this intent was built from.
    pub fn hash(&self) -> [u8; 4] {
        self.hash
    }

    /// Train the sentence classifier and one extractor per placeholder
    /// found in this intent's positive examples.
    pub fn train(&mut self, corpus: &TrainingCorpus) -> Result<()> {
        let mut tokens: Vec<String> = corpus
            .my_sents(&self.name)
            .iter()
            .flatten()
            .filter(|t| t.starts_with('{'))
            .cloned()
            .collect();
        tokens.sort();
        tokens.dedup();

        self.sentence.train(&self.name, corpus)?;
        self.extractors = tokens
            .iter()
            .map(|token| {
                let mut extractor = PositionalExtractor::new(token);
                extractor.train(&self.name, corpus)?;
                Ok(extractor)
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    /// Match a tokenized query against this intent.
    ///
    /// Candidates expand combinatorially across all placeholders, then
    /// every fully substituted candidate is re-scored by the sentence
    /// classifier; that re-score (averaged with any registered entity
    /// scores over the extracted spans) replaces the accumulated
    /// boundary confidence. The best candidate wins.
    pub fn match_tokens(&self, sent: &[String], entities: &EntityMap) -> MatchCandidate {
        let mut pool = vec![MatchCandidate::new(sent.to_vec())];
        for extractor in &self.extractors {
            let entity = entities.get(extractor.token()).map(|e| e.as_ref());
            let mut expanded = Vec::new();
            for candidate in &pool {
                expanded.extend(extractor.expand(candidate, entity));
            }
            pool.extend(expanded);
        }

        pool.into_iter()
            .map(|mut candidate| {
                let mut total = self.sentence.score(&candidate.sent);
                let mut terms = 1.0;
                for (token, span) in &candidate.matches {
                    if let Some(entity) = entities.get(token) {
                        total += entity.score(span);
                        terms += 1.0;
                    }
                }
                candidate.conf = total / terms;
                candidate
            })
            .max_by(|a, b| a.conf.partial_cmp(&b.conf).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or_else(|| MatchCandidate::new(sent.to_vec()))
    }

    /// Persist under `dir/{name}.*`: hash stamp, sentence classifier,
    /// placeholder manifest, and the per-placeholder boundary pairs.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let prefix = dir.join(&self.name);
        std::fs::write(append_suffix(&prefix, ".hash"), self.hash)?;
        self.sentence.save(&prefix)?;

        let pos_prefix = append_suffix(&prefix, ".pos");
        let tokens: Vec<&str> = self.extractors.iter().map(|e| e.token()).collect();
        std::fs::write(&pos_prefix, serde_json::to_vec(&tokens)?)?;
        for extractor in &self.extractors {
            extractor.save(&pos_prefix)?;
        }
        Ok(())
    }

    /// Load a previously persisted intent.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let prefix = dir.join(name);
        let bytes = std::fs::read(append_suffix(&prefix, ".hash"))?;
        let hash = bytes
            .try_into()
            .map_err(|_| ParlanceError::cache(format!("bad hash stamp for '{name}'")))?;
        let sentence = SentenceClassifier::load(&prefix)?;

        let pos_prefix = append_suffix(&prefix, ".pos");
        let tokens: Vec<String> = serde_json::from_slice(&std::fs::read(&pos_prefix)?)?;
        let extractors = tokens
            .iter()
            .map(|token| PositionalExtractor::load(token, &pos_prefix))
            .collect::<Result<_>>()?;

        Ok(Intent {
            name: name.to_string(),
            hash,
            sentence,
            extractors,
        })
    }
}
