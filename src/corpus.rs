//! Training corpus: per-intent collections of tokenized example sentences.
//!
//! Each registered name owns its positive sentences; at training time
//! every other name's sentences double as that intent's negatives, which
//! is what makes confidences comparable across intents.

use std::collections::HashMap;

use crate::analysis::tokenize;

/// Tokenized training sentences grouped by intent (or entity) name.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    sent_lists: HashMap<String, Vec<Vec<String>>, ahash::RandomState>,
}

impl TrainingCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        TrainingCorpus::default()
    }

    /// Register the training lines for a name, replacing any previous
    /// registration. Blank lines are dropped.
    pub fn add_lines(&mut self, name: &str, lines: &[String]) {
        let sents = lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| tokenize(line))
            .collect();
        self.sent_lists.insert(name.to_string(), sents);
    }

    /// Remove a name and its sentences.
    pub fn remove(&mut self, name: &str) {
        self.sent_lists.remove(name);
    }

    /// The positive sentences belonging to `name`.
    pub fn my_sents(&self, name: &str) -> &[Vec<String>] {
        self.sent_lists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every sentence belonging to any other name, i.e. the negatives.
    pub fn other_sents<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Vec<String>> {
        self.sent_lists
            .iter()
            .filter(move |(key, _)| key.as_str() != name)
            .flat_map(|(_, sents)| sents.iter())
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.sent_lists.len()
    }

    /// True if no names are registered.
    pub fn is_empty(&self) -> bool {
        self.sent_lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_my_and_other_sents() {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines("greet", &["hello there".to_string(), "hi".to_string()]);
        corpus.add_lines("bye", &["goodbye".to_string()]);

        assert_eq!(corpus.my_sents("greet").len(), 2);
        assert_eq!(corpus.my_sents("greet")[0], vec!["hello", "there"]);

        let others: Vec<_> = corpus.other_sents("greet").collect();
        assert_eq!(others, vec![&vec!["goodbye".to_string()]]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines(
            "greet",
            &["hello".to_string(), "   ".to_string(), String::new()],
        );
        assert_eq!(corpus.my_sents("greet").len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut corpus = TrainingCorpus::new();
        corpus.add_lines("greet", &["hello".to_string()]);
        corpus.remove("greet");
        assert!(corpus.my_sents("greet").is_empty());
        assert!(corpus.is_empty());
    }

    #[test]
    fn test_missing_name_is_empty() {
        let corpus = TrainingCorpus::new();
        assert!(corpus.my_sents("nope").is_empty());
        assert_eq!(corpus.other_sents("nope").count(), 0);
    }
}
