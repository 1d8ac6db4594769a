//! Per-model vocabularies and feature vector construction.
//!
//! A [`Vocabulary`] maps tokens to stable integer slots in a fixed-length
//! feature vector. The mapping is append-only while a model trains and
//! immutable afterward; index assignment order determines feature-vector
//! layout and is preserved exactly across persistence round-trips.
//!
//! Every classifier owns its own vocabulary; there is no process-wide
//! token table, so independent containers cannot leak ids into each other.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::Result;

/// Reserved slot carrying the ratio of unknown tokens in the input.
pub const UNKNOWN_TOKEN: &str = ":0";

/// Reserved slot carrying the inverse distance to the sentence edge.
/// Only registered by boundary classifiers.
pub const END_TOKEN: &str = ":end";

type TokenMap = HashMap<String, usize, ahash::RandomState>;

/// An append-only token → slot index mapping.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    ids: TokenMap,
}

impl Vocabulary {
    /// Create a vocabulary with the given reserved tokens registered first,
    /// so their slots are stable regardless of later training input.
    pub fn with_reserved(reserved: &[&str]) -> Self {
        let mut vocab = Vocabulary { ids: TokenMap::default() };
        for token in reserved {
            vocab.add_token(token);
        }
        vocab
    }

    /// Number of registered tokens (the feature vector length).
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no tokens have been registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Register a token at the next free index. No-op if already present.
    pub fn add_token(&mut self, token: &str) {
        if !self.ids.contains_key(token) {
            self.ids.insert(token.to_string(), self.ids.len());
        }
    }

    /// Register every token of a sentence.
    pub fn add_sent(&mut self, sent: &[String]) {
        for token in sent {
            self.add_token(token);
        }
    }

    /// Whether a token has a slot in this vocabulary.
    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// Produce a zero vector sized to the current vocabulary length.
    pub fn vector(&self) -> Vec<f64> {
        vec![0.0; self.ids.len()]
    }

    /// Set the value at a token's slot. Unknown tokens are ignored; the
    /// caller accounts for them through the unknown-token ratio instead.
    pub fn assign(&self, vector: &mut [f64], token: &str, value: f64) {
        if let Some(&index) = self.ids.get(token) {
            vector[index] = value;
        }
    }

    /// Add `value` to the token's slot. Unknown tokens are ignored.
    pub fn accumulate(&self, vector: &mut [f64], token: &str, value: f64) {
        if let Some(&index) = self.ids.get(token) {
            vector[index] += value;
        }
    }

    /// Persist the index mapping as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, &self.ids)?;
        Ok(())
    }

    /// Restore a previously saved index mapping.
    ///
    /// Reproduces the exact same index assignment, so vectors produced
    /// before saving remain valid against the reloaded model.
    pub fn load(path: &Path) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        let ids: TokenMap = serde_json::from_reader(file)?;
        Ok(Vocabulary { ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_only_indices() {
        let mut vocab = Vocabulary::with_reserved(&[UNKNOWN_TOKEN]);
        vocab.add_token("hello");
        vocab.add_token("world");
        vocab.add_token("hello");
        assert_eq!(vocab.len(), 3);

        let mut v = vocab.vector();
        vocab.assign(&mut v, "world", 1.0);
        assert_eq!(v.iter().filter(|&&x| x == 1.0).count(), 1);
    }

    #[test]
    fn test_unknown_token_ignored() {
        let vocab = Vocabulary::with_reserved(&[UNKNOWN_TOKEN]);
        let mut v = vocab.vector();
        vocab.assign(&mut v, "never-registered", 1.0);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.vocab");

        let mut vocab = Vocabulary::with_reserved(&[UNKNOWN_TOKEN, END_TOKEN]);
        for token in ["drive", "to", "{place}"] {
            vocab.add_token(token);
        }
        vocab.save(&path).unwrap();

        let reloaded = Vocabulary::load(&path).unwrap();
        assert_eq!(reloaded.len(), vocab.len());

        // The exact index assignment must survive the round trip.
        let mut before = vocab.vector();
        let mut after = reloaded.vector();
        for (i, token) in ["drive", "to", "{place}", END_TOKEN].iter().enumerate() {
            vocab.assign(&mut before, token, 1.0 + i as f64);
            reloaded.assign(&mut after, token, 1.0 + i as f64);
        }
        assert_eq!(before, after);
    }
}
