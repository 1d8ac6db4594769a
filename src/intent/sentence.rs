//! Whole-sentence confidence classifier.
//!
//! One per intent (entities reuse it as pseudo-intents). Feature vectors
//! are bag-of-words over the intent's own vocabulary plus an
//! unknown-token-ratio slot, so unseen words soften confidence instead of
//! rejecting the sentence.

use std::path::Path;

use crate::classifier::{
    FeedForwardNetwork, Predictor, TrainParams, TrainingSample, resolve_conflicts,
};
use crate::corpus::TrainingCorpus;
use crate::error::{ParlanceError, Result};
use crate::util::append_suffix;
use crate::vocab::{UNKNOWN_TOKEN, Vocabulary};

/// Hidden layer width, two layers deep.
const HIDDEN_SIZE: usize = 15;

/// Target for a positive sentence polluted with filler tokens; teaches
/// tolerance to extraneous words without treating them as full matches.
const LENIENCE: f64 = 0.6;

/// Filler token used for pollution. Never registered in the vocabulary,
/// so it only raises the unknown-token ratio.
const NULL_TOKEN: &str = ":null:";

/// General classifier used to match whole sentences or phrases.
#[derive(Debug)]
pub struct SentenceClassifier {
    vocab: Vocabulary,
    net: Option<FeedForwardNetwork>,
}

impl Default for SentenceClassifier {
    fn default() -> Self {
        SentenceClassifier::new()
    }
}

impl SentenceClassifier {
    /// Create an untrained classifier.
    pub fn new() -> Self {
        SentenceClassifier {
            vocab: Vocabulary::with_reserved(&[UNKNOWN_TOKEN]),
            net: None,
        }
    }

    /// Build the bag-of-words feature vector for a sentence.
    pub fn vectorize(&self, sent: &[String]) -> Vec<f64> {
        let mut vector = self.vocab.vector();
        let mut unknown = 0usize;
        for token in sent {
            if self.vocab.contains(token) {
                self.vocab.assign(&mut vector, token, 1.0);
            } else {
                unknown += 1;
            }
        }
        if !sent.is_empty() {
            self.vocab
                .assign(&mut vector, UNKNOWN_TOKEN, unknown as f64 / sent.len() as f64);
        }
        vector
    }

    /// Score a sentence. Untrained classifiers score 0.0.
    pub fn score(&self, sent: &[String]) -> f64 {
        match &self.net {
            Some(net) => net.predict(&self.vectorize(sent)),
            None => 0.0,
        }
    }

    /// Train from the corpus: `name`'s sentences are positives, every
    /// other name's sentences are negatives.
    pub fn train(&mut self, name: &str, corpus: &TrainingCorpus) -> Result<()> {
        if corpus.my_sents(name).is_empty() {
            return Err(ParlanceError::training(format!(
                "cannot train '{name}' without positive examples"
            )));
        }

        for sent in corpus.my_sents(name) {
            self.vocab.add_sent(sent);
        }

        let mut samples = Vec::new();
        let mut add = |classifier: &SentenceClassifier, sent: &[String], target: f64| {
            samples.push(TrainingSample::new(classifier.vectorize(sent), target));
        };

        for sent in corpus.my_sents(name) {
            add(self, sent, 1.0);

            // Simulate extra words at either end of the sentence.
            let fillers = (sent.len() + 2) / 3;
            let mut front = vec![NULL_TOKEN.to_string(); fillers];
            front.extend_from_slice(sent);
            add(self, &front, LENIENCE);

            let mut back = sent.to_vec();
            back.extend(std::iter::repeat_n(NULL_TOKEN.to_string(), fillers));
            add(self, &back, LENIENCE);

            // Longer words are more informative: each word alone carries
            // its cubed-length share of the sentence's total weight.
            let total_weight: f64 = sent.iter().map(|w| (w.len() as f64).powi(3)).sum();
            if total_weight > 0.0 {
                for word in sent {
                    let weight = (word.len() as f64).powi(3) / total_weight;
                    add(self, std::slice::from_ref(word), weight);
                }
            }
        }

        for sent in corpus.other_sents(name) {
            add(self, sent, 0.0);
        }
        add(self, &[], 0.0);

        let samples = resolve_conflicts(samples);

        let mut net = FeedForwardNetwork::new(
            &[self.vocab.len(), HIDDEN_SIZE, HIDDEN_SIZE, 1],
            TrainParams::mean_squared_error(0.001),
        );
        net.train(&samples)?;
        self.net = Some(net);
        Ok(())
    }

    /// Persist the trained network and vocabulary under `prefix.intent.*`.
    pub fn save(&self, prefix: &Path) -> Result<()> {
        let prefix = append_suffix(prefix, ".intent");
        let net = self
            .net
            .as_ref()
            .ok_or_else(|| ParlanceError::training("cannot save an untrained classifier"))?;
        std::fs::write(append_suffix(&prefix, ".net"), bincode::serialize(net)?)?;
        self.vocab.save(&append_suffix(&prefix, ".vocab"))?;
        Ok(())
    }

    /// Load a previously persisted classifier.
    pub fn load(prefix: &Path) -> Result<Self> {
        let prefix = append_suffix(prefix, ".intent");
        let bytes = std::fs::read(append_suffix(&prefix, ".net"))?;
        let net: FeedForwardNetwork = bincode::deserialize(&bytes)?;
        let vocab = Vocabulary::load(&append_suffix(&prefix, ".vocab"))?;
        Ok(SentenceClassifier { vocab, net: Some(net) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenize;

    fn corpus() -> TrainingCorpus {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines(
            "greet",
            &["hello there".to_string(), "hi how are you".to_string()],
        );
        corpus.add_lines(
            "weather",
            &["what is the weather".to_string(), "is it raining".to_string()],
        );
        corpus
    }

    #[test]
    fn test_train_and_score() {
        let corpus = corpus();
        let mut classifier = SentenceClassifier::new();
        classifier.train("greet", &corpus).unwrap();

        let own = classifier.score(&tokenize("hello there"));
        let other = classifier.score(&tokenize("what is the weather"));
        assert!(own > 0.5, "own sentence scored {own}");
        assert!(other < 0.5, "other intent's sentence scored {other}");
        assert!(own > other);
    }

    #[test]
    fn test_untrained_scores_zero() {
        let classifier = SentenceClassifier::new();
        assert_eq!(classifier.score(&tokenize("anything")), 0.0);
    }

    #[test]
    fn test_no_positives_is_error() {
        let corpus = corpus();
        let mut classifier = SentenceClassifier::new();
        assert!(classifier.train("missing", &corpus).is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("greet");

        let corpus = corpus();
        let mut classifier = SentenceClassifier::new();
        classifier.train("greet", &corpus).unwrap();
        classifier.save(&prefix).unwrap();

        let reloaded = SentenceClassifier::load(&prefix).unwrap();
        let sent = tokenize("hello there");
        assert!((classifier.score(&sent) - reloaded.score(&sent)).abs() < 1e-9);
    }
}
