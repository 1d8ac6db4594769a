//! Boundary classifiers for entity span edges.
//!
//! Each placeholder gets a left and a right [`EdgeClassifier`]. Features
//! at a candidate position are built by walking outward from the position
//! toward the relevant sentence edge: closer tokens contribute more
//! (inverse distance), with reserved slots for the unknown-token ratio
//! and the inverse distance from the position to the sentence edge.

use std::path::Path;

use crate::classifier::{
    FeedForwardNetwork, Predictor, TrainParams, TrainingSample, resolve_conflicts,
};
use crate::corpus::TrainingCorpus;
use crate::error::{ParlanceError, Result};
use crate::util::append_suffix;
use crate::vocab::{END_TOKEN, UNKNOWN_TOKEN, Vocabulary};

/// Bit-fail tolerance for the early-stop criterion.
const BIT_FAIL_LIMIT: f64 = 0.1;

/// Which span edge a classifier scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    /// Scores candidate span starts; walks leftward.
    Left,
    /// Scores candidate span ends; walks rightward.
    Right,
}

impl EdgeSide {
    fn step(self) -> isize {
        match self {
            EdgeSide::Left => -1,
            EdgeSide::Right => 1,
        }
    }

    /// One-past-the-edge index in walk direction: `-1` leftward,
    /// `len` rightward.
    fn edge_index(self, len: usize) -> isize {
        match self {
            EdgeSide::Left => -1,
            EdgeSide::Right => len as isize,
        }
    }

    fn file_marker(self) -> &'static str {
        match self {
            EdgeSide::Left => ".l",
            EdgeSide::Right => ".r",
        }
    }
}

/// Scores how likely a token position is one edge of an entity span.
#[derive(Debug)]
pub struct EdgeClassifier {
    token: String,
    side: EdgeSide,
    vocab: Vocabulary,
    net: Option<FeedForwardNetwork>,
}

impl EdgeClassifier {
    /// Create an untrained edge classifier for a placeholder token
    /// (something like `{place}`).
    pub fn new(token: &str, side: EdgeSide) -> Self {
        EdgeClassifier {
            token: token.to_string(),
            side,
            vocab: Vocabulary::with_reserved(&[UNKNOWN_TOKEN, END_TOKEN]),
            net: None,
        }
    }

    /// Build the feature vector for a candidate boundary at `pos`.
    pub fn vectorize(&self, sent: &[String], pos: usize) -> Vec<f64> {
        let mut vector = self.vocab.vector();
        let mut unknown = 0usize;
        let edge = self.side.edge_index(sent.len());
        let step = self.side.step();

        let mut i = pos as isize + step;
        while i != edge {
            let token = &sent[i as usize];
            if self.vocab.contains(token) {
                let distance = (i - pos as isize).unsigned_abs() as f64;
                self.vocab.accumulate(&mut vector, token, 1.0 / distance);
            } else {
                unknown += 1;
            }
            i += step;
        }

        let edge_distance = (edge - pos as isize).unsigned_abs() as f64;
        self.vocab.assign(&mut vector, END_TOKEN, 1.0 / edge_distance);
        if !sent.is_empty() {
            self.vocab
                .assign(&mut vector, UNKNOWN_TOKEN, unknown as f64 / sent.len() as f64);
        }
        vector
    }

    /// Score a candidate boundary position. Untrained classifiers
    /// score 0.0.
    pub fn score(&self, sent: &[String], pos: usize) -> f64 {
        match &self.net {
            Some(net) => net.predict(&self.vectorize(sent, pos)),
            None => 0.0,
        }
    }

    /// Train from the corpus. Vocabulary is built only from this intent's
    /// own sentences: the tokens between the placeholder and the edge.
    pub fn train(&mut self, name: &str, corpus: &TrainingCorpus) -> Result<()> {
        let step = self.side.step();
        for sent in corpus.my_sents(name) {
            if let Some(index) = sent.iter().position(|t| t == &self.token) {
                let edge = self.side.edge_index(sent.len());
                let mut i = index as isize + step;
                while i != edge {
                    self.vocab.add_token(&sent[i as usize]);
                    i += step;
                }
            }
        }

        let mut samples = Vec::new();
        for sent in corpus.my_sents(name) {
            for (pos, token) in sent.iter().enumerate() {
                let target = if token == &self.token { 1.0 } else { 0.0 };
                samples.push(TrainingSample::new(self.vectorize(sent, pos), target));
            }
        }
        // Other intents' sentences are pure negatives at every position.
        for sent in corpus.other_sents(name) {
            for pos in 0..sent.len() {
                samples.push(TrainingSample::new(self.vectorize(sent, pos), 0.0));
            }
        }
        let samples = resolve_conflicts(samples);
        if samples.is_empty() {
            return Err(ParlanceError::training(format!(
                "no boundary samples for '{}' in '{name}'",
                self.token
            )));
        }

        let hidden = (self.vocab.len() / 2).max(1);
        let mut net = FeedForwardNetwork::new(
            &[self.vocab.len(), hidden, 1],
            TrainParams::bit_fail(BIT_FAIL_LIMIT),
        );
        net.train(&samples)?;
        self.net = Some(net);
        Ok(())
    }

    /// Persist under `prefix.l.*` or `prefix.r.*`.
    pub fn save(&self, prefix: &Path) -> Result<()> {
        let prefix = append_suffix(prefix, self.side.file_marker());
        let net = self
            .net
            .as_ref()
            .ok_or_else(|| ParlanceError::training("cannot save an untrained classifier"))?;
        std::fs::write(append_suffix(&prefix, ".net"), bincode::serialize(net)?)?;
        self.vocab.save(&append_suffix(&prefix, ".vocab"))?;
        Ok(())
    }

    /// Load a previously persisted edge classifier.
    pub fn load(token: &str, side: EdgeSide, prefix: &Path) -> Result<Self> {
        let prefix = append_suffix(prefix, side.file_marker());
        let bytes = std::fs::read(append_suffix(&prefix, ".net"))?;
        let net: FeedForwardNetwork = bincode::deserialize(&bytes)?;
        let vocab = Vocabulary::load(&append_suffix(&prefix, ".vocab"))?;
        Ok(EdgeClassifier {
            token: token.to_string(),
            side,
            vocab,
            net: Some(net),
        })
    }
}
