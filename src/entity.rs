//! Entities as pseudo-intents.
//!
//! An entity is a named span type (`{place}`) with its own example
//! values. Structurally it is just a whole-sentence classifier trained
//! over those values, cached and persisted exactly like an intent. At
//! match time a registered entity re-scores extracted span text, pulling
//! candidate selection toward spans that look like the entity's examples.
//!
//! Entity names are wrapped to their placeholder form for storage, so
//! the entity registered as `place` is looked up by the token `{place}`.
//! Independently authored intent sets avoid name collisions by prefixing
//! inside the name (hyphens survive tokenization): `nav-place`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::corpus::TrainingCorpus;
use crate::error::Result;
use crate::intent::sentence::SentenceClassifier;

/// Lookup table handed to matching: placeholder token → trained entity.
pub type EntityMap = HashMap<String, Arc<Entity>, ahash::RandomState>;

/// Wrap an entity name into its placeholder token form.
pub fn wrap_name(name: &str) -> String {
    format!("{{{name}}}")
}

/// A named span type backed by a sentence classifier over example values.
#[derive(Debug)]
pub struct Entity {
    name: String,
    hash: [u8; 4],
    classifier: SentenceClassifier,
}

impl Entity {
    /// Create an untrained entity. `name` is the wrapped placeholder
    /// token, e.g. `{place}`.
    pub fn new(name: &str, hash: [u8; 4]) -> Self {
        Entity {
            name: name.to_string(),
            hash,
            classifier: SentenceClassifier::new(),
        }
    }

    /// The wrapped placeholder token this entity answers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content hash of the training lines this entity was built from.
    pub fn hash(&self) -> [u8; 4] {
        self.hash
    }

    /// Score how much a token span looks like this entity's examples.
    pub fn score(&self, span: &[String]) -> f64 {
        self.classifier.score(span)
    }

    /// Train from the corpus; other entities' values act as negatives.
    pub fn train(&mut self, corpus: &TrainingCorpus) -> Result<()> {
        self.classifier.train(&self.name, corpus)
    }

    /// Persist under `dir/{name}.*`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let prefix = dir.join(&self.name);
        std::fs::write(crate::util::append_suffix(&prefix, ".hash"), self.hash)?;
        self.classifier.save(&prefix)
    }

    /// Load a previously persisted entity.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let prefix = dir.join(name);
        let bytes = std::fs::read(crate::util::append_suffix(&prefix, ".hash"))?;
        let hash = bytes
            .try_into()
            .map_err(|_| crate::error::ParlanceError::cache(format!("bad hash stamp for '{name}'")))?;
        Ok(Entity {
            name: name.to_string(),
            hash,
            classifier: SentenceClassifier::load(&prefix)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenize;

    #[test]
    fn test_wrap_name() {
        assert_eq!(wrap_name("place"), "{place}");
        assert_eq!(wrap_name("nav-place"), "{nav-place}");
    }

    #[test]
    fn test_entity_scores_own_values_higher() {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines(
            "{place}",
            &["the lake".to_string(), "the beach".to_string(), "town".to_string()],
        );
        corpus.add_lines("{food}", &["a pizza".to_string(), "some pasta".to_string()]);

        let mut entity = Entity::new("{place}", [0; 4]);
        entity.train(&corpus).unwrap();

        let place = entity.score(&tokenize("the lake"));
        let food = entity.score(&tokenize("a pizza"));
        assert!(place > food, "place {place} vs food {food}");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines("{place}", &["the lake".to_string(), "the sea".to_string()]);

        let mut entity = Entity::new("{place}", [1, 2, 3, 4]);
        entity.train(&corpus).unwrap();
        entity.save(dir.path()).unwrap();

        let reloaded = Entity::load(dir.path(), "{place}").unwrap();
        assert_eq!(reloaded.hash(), [1, 2, 3, 4]);
        let span = tokenize("the lake");
        assert!((entity.score(&span) - reloaded.score(&span)).abs() < 1e-9);
    }
}
