//! The top-level intent container facade.
//!
//! Owns an intent manager and an entity manager (same orchestration,
//! different models), plus the deterministic fast-path matcher, and
//! merges probabilistic and exact results into one ranked list.

pub mod manager;

pub use manager::{CacheableModel, ModelManager, TrainOptions, TrainReport};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::ThreadPoolBuilder;

use crate::analysis::tokenize;
use crate::entity::{Entity, EntityMap, wrap_name};
use crate::error::{ParlanceError, Result};
use crate::exact::{ExactMatcher, ExactPatternMatcher};
use crate::intent::Intent;
use crate::matching::{MatchResult, rank_cmp};

/// Loads, trains, and matches a collection of intents and entities.
pub struct IntentContainer {
    intents: ModelManager<Intent>,
    entities: ModelManager<Entity>,
    exact: Box<dyn ExactMatcher>,
}

impl IntentContainer {
    /// Create a container persisting trained models into `cache_dir`.
    /// The directory is created on the first training round.
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .thread_name(|i| format!("parlance-train-{i}"))
            .build()
            .map_err(|e| ParlanceError::other(format!("failed to create thread pool: {e}")))?;
        let pool = Arc::new(pool);

        Ok(IntentContainer {
            intents: ModelManager::new(cache_dir.clone(), pool.clone()),
            entities: ModelManager::new(cache_dir, pool),
            exact: Box::new(ExactPatternMatcher::new()),
        })
    }

    /// Replace the deterministic fast-path backend. Patterns registered
    /// so far are not carried over, so call this before adding intents.
    pub fn with_exact_matcher(mut self, matcher: Box<dyn ExactMatcher>) -> Self {
        self.exact = matcher;
        self
    }

    /// Register an intent from literal example lines.
    ///
    /// Fails fast when no line contains a positive example.
    pub fn add_intent(&mut self, name: &str, lines: &[String]) -> Result<()> {
        if name.is_empty() {
            return Err(ParlanceError::invalid_argument("intent name must not be empty"));
        }
        self.intents.add(name, lines)?;
        self.exact.add_intent(name, lines);
        Ok(())
    }

    /// Register an intent from a file with one example per line.
    pub fn add_intent_from_file<P: Into<PathBuf>>(&mut self, name: &str, path: P) -> Result<()> {
        let lines = read_lines(path)?;
        self.add_intent(name, &lines)
    }

    /// Register an entity from literal example values.
    ///
    /// The entity answers to the placeholder `{name}`. Independently
    /// authored intent sets avoid collisions by prefixing inside the
    /// name, e.g. `nav-place`.
    pub fn add_entity(&mut self, name: &str, lines: &[String]) -> Result<()> {
        if name.is_empty() {
            return Err(ParlanceError::invalid_argument("entity name must not be empty"));
        }
        self.entities.add(&wrap_name(name), lines)?;
        self.exact.add_entity(name, lines);
        Ok(())
    }

    /// Register an entity from a file with one value per line.
    pub fn add_entity_from_file<P: Into<PathBuf>>(&mut self, name: &str, path: P) -> Result<()> {
        let lines = read_lines(path)?;
        self.add_entity(name, &lines)
    }

    /// Remove an intent: immediately excluded from matching and from the
    /// deterministic fast path. Cache files are left behind.
    pub fn remove_intent(&mut self, name: &str) {
        self.intents.remove(name);
        self.exact.remove_intent(name);
    }

    /// Remove an entity by its unwrapped name.
    pub fn remove_entity(&mut self, name: &str) {
        self.entities.remove(&wrap_name(name));
        self.exact.remove_entity(name);
    }

    /// Train everything that needs it: entities first (intents re-score
    /// entity spans at match time), then intents. One shared deadline
    /// bounds both rounds.
    pub fn train(&self, opts: TrainOptions) -> Result<TrainReport> {
        let deadline = opts.timeout.map(|t| Instant::now() + t);
        let mut report = self.entities.train(&opts, deadline)?;
        report.merge(self.intents.train(&opts, deadline)?);
        Ok(report)
    }

    /// Match a query against every trained intent and return the full
    /// ranked list: probabilistic results overlaid by fast-path hits,
    /// sorted by confidence with the shortest-entity-text tie-break.
    ///
    /// Intents still training in the background are skipped rather than
    /// waited for: availability over latency.
    pub fn calc_intents(&self, query: &str) -> Vec<MatchResult> {
        let sent = tokenize(query);
        let entity_map: EntityMap = self.entities.loaded().into_iter().collect();

        let mut results: Vec<MatchResult> = self
            .intents
            .loaded()
            .iter()
            .map(|(name, intent)| {
                let candidate = intent.match_tokens(&sent, &entity_map);
                MatchResult::from_candidate(name, &candidate)
            })
            .collect();

        // Any fast-path hit overrides that intent's probabilistic result.
        for hit in self.exact.matches(query) {
            let result = MatchResult {
                name: hit.name.clone(),
                sent: query.to_string(),
                matches: hit.entities,
                conf: 1.0,
            };
            match results.iter_mut().find(|r| r.name == hit.name) {
                Some(existing) => *existing = result,
                None => results.push(result),
            }
        }

        results.sort_by(rank_cmp);
        results
    }

    /// Match a query and return only the best result. An empty registry
    /// yields the zero-confidence placeholder rather than failing.
    pub fn calc_intent(&self, query: &str) -> MatchResult {
        self.calc_intents(query)
            .into_iter()
            .next()
            .unwrap_or_else(MatchResult::placeholder)
    }

    /// Number of registered intents.
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }
}

fn read_lines<P: Into<PathBuf>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.into())?;
    Ok(content.lines().map(str::to_string).collect())
}
