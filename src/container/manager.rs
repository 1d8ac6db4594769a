//! Cache-aware, parallel, timeout-bounded training orchestration.
//!
//! A [`ModelManager`] owns a collection of cacheable models (intents, or
//! entities as pseudo-intents; the orchestration is identical) and
//! decides per item whether to reuse a persisted model or (re)train it.
//! Re-registering a name whose task is still running defers its next
//! scheduling until that task finishes, so two tasks never write the
//! same cache prefix concurrently.
//! Training is embarrassingly parallel: items share no mutable state, so
//! each gets its own task on the manager's thread pool and persists
//! independently on its own completion. A round timeout is cooperative:
//! the round stops waiting at the bound and reports partial completion,
//! while already-started items run to completion in the background and
//! land in the cache without corrupting anything.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::corpus::TrainingCorpus;
use crate::entity::Entity;
use crate::error::{ParlanceError, Result};
use crate::intent::Intent;
use crate::util::{append_suffix, lines_hash};

/// A model the manager can train, persist, and reload by name.
///
/// [`Intent`] and [`Entity`] both implement this; anything else that can
/// be built from a [`TrainingCorpus`] slice fits too.
pub trait CacheableModel: Send + Sync + Sized + 'static {
    /// Create an untrained model stamped with its corpus hash.
    fn create(name: &str, hash: [u8; 4]) -> Self;

    /// Train from the corpus (the model's own name selects positives).
    fn train(&mut self, corpus: &TrainingCorpus) -> Result<()>;

    /// Persist under the cache directory, hash stamp included.
    fn save(&self, dir: &Path) -> Result<()>;

    /// Reload a persisted model.
    fn load(dir: &Path, name: &str) -> Result<Self>;
}

impl CacheableModel for Intent {
    fn create(name: &str, hash: [u8; 4]) -> Self {
        Intent::new(name, hash)
    }

    fn train(&mut self, corpus: &TrainingCorpus) -> Result<()> {
        Intent::train(self, corpus)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        Intent::save(self, dir)
    }

    fn load(dir: &Path, name: &str) -> Result<Self> {
        Intent::load(dir, name)
    }
}

impl CacheableModel for Entity {
    fn create(name: &str, hash: [u8; 4]) -> Self {
        Entity::new(name, hash)
    }

    fn train(&mut self, corpus: &TrainingCorpus) -> Result<()> {
        Entity::train(self, corpus)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        Entity::save(self, dir)
    }

    fn load(dir: &Path, name: &str) -> Result<Self> {
        Entity::load(dir, name)
    }
}

/// Options for a training round.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainOptions {
    /// Retrain even when the persisted hash stamp matches.
    pub force: bool,
    /// Train inline on the calling thread instead of the pool.
    pub single_thread: bool,
    /// Bound on the whole round. Items unfinished at the bound remain
    /// retryable; items already started keep running in the background.
    pub timeout: Option<Duration>,
}

/// Outcome of a training round.
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    /// Items trained and persisted during this round.
    pub trained: Vec<String>,
    /// Items that failed to train; retryable.
    pub failed: Vec<String>,
    /// Items still unfinished when the round returned; retryable.
    pub pending: Vec<String>,
    /// Items reused from cache or already loaded.
    pub cached: usize,
}

impl TrainReport {
    /// True when nothing is left outstanding or failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.pending.is_empty()
    }

    /// Fold another round's outcome into this one.
    pub fn merge(&mut self, other: TrainReport) {
        self.trained.extend(other.trained);
        self.failed.extend(other.failed);
        self.pending.extend(other.pending);
        self.cached += other.cached;
    }
}

enum ModelState<M> {
    /// Needs (re)training.
    Unloaded,
    /// A training task is in flight.
    Training,
    /// Trained (or reloaded) and ready for matching.
    Loaded(Arc<M>),
}

struct Slot<M> {
    hash: [u8; 4],
    state: RwLock<ModelState<M>>,
}

type SlotMap<M> = HashMap<String, Arc<Slot<M>>, ahash::RandomState>;

/// Orchestrates caching, training scheduling, timeouts, and persistence
/// for a collection of models.
pub struct ModelManager<M: CacheableModel> {
    cache_dir: PathBuf,
    corpus: Arc<RwLock<TrainingCorpus>>,
    slots: Arc<RwLock<SlotMap<M>>>,
    pool: Arc<ThreadPool>,
    /// Only one training round per manager may be in flight.
    train_lock: Mutex<()>,
    /// Names with a training task still running, including tasks whose
    /// slot was replaced by a re-registration mid-flight. Tasks remove
    /// themselves after their cache files are written.
    in_flight: Arc<Mutex<HashSet<String>>>,
    /// Completion tally. The channel outlives rounds so that items from
    /// a timed-out round still report in and can be awaited later.
    done_tx: Sender<(String, bool)>,
    done_rx: Receiver<(String, bool)>,
}

impl<M: CacheableModel> ModelManager<M> {
    /// Create a manager persisting into `cache_dir`, scheduling onto the
    /// given pool.
    pub fn new(cache_dir: PathBuf, pool: Arc<ThreadPool>) -> Self {
        let (done_tx, done_rx) = unbounded();
        ModelManager {
            cache_dir,
            corpus: Arc::new(RwLock::new(TrainingCorpus::new())),
            slots: Arc::new(RwLock::new(SlotMap::default())),
            pool,
            train_lock: Mutex::new(()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            done_tx,
            done_rx,
        }
    }

    /// Register a model's training lines, loading a persisted model
    /// instead when its hash stamp matches.
    ///
    /// Fails fast when no line contains a positive example.
    pub fn add(&mut self, name: &str, lines: &[String]) -> Result<()> {
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Err(ParlanceError::training(format!(
                "cannot register '{name}' without positive examples"
            )));
        }

        let hash = lines_hash(lines);
        self.corpus.write().add_lines(name, lines);

        let stamp_path = append_suffix(&self.cache_dir.join(name), ".hash");
        let state = match std::fs::read(&stamp_path) {
            Ok(stamp) if stamp == hash => match M::load(&self.cache_dir, name) {
                Ok(model) => {
                    debug!(name, "reusing cached model");
                    ModelState::Loaded(Arc::new(model))
                }
                Err(e) => {
                    debug!(name, error = %e, "cache unusable, will retrain");
                    ModelState::Unloaded
                }
            },
            Ok(_) => {
                debug!(name, "training lines changed, will retrain");
                ModelState::Unloaded
            }
            Err(_) => ModelState::Unloaded,
        };

        self.slots.write().insert(
            name.to_string(),
            Arc::new(Slot {
                hash,
                state: RwLock::new(state),
            }),
        );
        Ok(())
    }

    /// Remove a model: immediately excluded from matching. Persisted
    /// cache files are left behind as optional housekeeping.
    pub fn remove(&mut self, name: &str) {
        self.slots.write().remove(name);
        self.corpus.write().remove(name);
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Snapshot of every model currently ready for matching. Items still
    /// training are skipped; matching prefers availability over
    /// waiting for a background round.
    pub fn loaded(&self) -> Vec<(String, Arc<M>)> {
        self.slots
            .read()
            .iter()
            .filter_map(|(name, slot)| match &*slot.state.read() {
                ModelState::Loaded(model) => Some((name.clone(), model.clone())),
                _ => None,
            })
            .collect()
    }

    /// Run one training round over every model that needs it.
    ///
    /// `deadline` bounds the whole round; callers sharing one deadline
    /// across managers pass the same instant to each.
    pub fn train(&self, opts: &TrainOptions, deadline: Option<Instant>) -> Result<TrainReport> {
        let _round = self.train_lock.lock();
        std::fs::create_dir_all(&self.cache_dir)?;

        // Stale completions can be left over from a timed-out round that
        // returned before its items reported in.
        let mut stale: HashSet<String> = HashSet::new();
        while let Ok((name, _)) = self.done_rx.try_recv() {
            stale.insert(name);
        }

        let mut report = TrainReport::default();
        let mut pending: HashSet<String> = HashSet::new();
        let mut deferred: Vec<String> = Vec::new();
        let mut scheduled: Vec<(String, Arc<Slot<M>>)> = Vec::new();

        for (name, slot) in self.slots.read().iter() {
            let mut state = slot.state.write();
            match &*state {
                ModelState::Loaded(_) if !opts.force => {
                    report.cached += 1;
                }
                ModelState::Training => {
                    // In flight from a previous timed-out round; await it
                    // but never reschedule (no concurrent cache writes).
                    if !stale.remove(name) {
                        pending.insert(name.clone());
                    }
                }
                _ => {
                    // A re-registration mid-flight replaces the slot but
                    // not the running task; that task still owns the
                    // name's cache files, so scheduling waits for the
                    // next round after it finishes. Deferred names are
                    // kept out of the completion tally: the orphaned
                    // task's result reflects the old lines.
                    if self.in_flight.lock().contains(name) {
                        deferred.push(name.clone());
                    } else {
                        *state = ModelState::Training;
                        pending.insert(name.clone());
                        scheduled.push((name.clone(), slot.clone()));
                    }
                }
            }
        }

        if opts.single_thread {
            for (name, slot) in scheduled {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    *slot.state.write() = ModelState::Unloaded;
                    continue;
                }
                pending.remove(&name);
                if train_and_store(&name, &slot, &self.corpus, &self.cache_dir) {
                    report.trained.push(name);
                } else {
                    report.failed.push(name);
                }
            }
        } else {
            for (name, slot) in scheduled {
                let corpus = self.corpus.clone();
                let dir = self.cache_dir.clone();
                let tx = self.done_tx.clone();
                self.in_flight.lock().insert(name.clone());
                let in_flight = self.in_flight.clone();
                self.pool.spawn(move || {
                    let ok = train_and_store(&name, &slot, &corpus, &dir);
                    in_flight.lock().remove(&name);
                    let _ = tx.send((name, ok));
                });
            }
        }

        // Tally completions until everything reported in or the deadline
        // passed. A stale Training item from a crashed task would hang a
        // deadline-less wait; the channel disconnecting cannot happen
        // while we hold a sender, so rely on the deadline alone.
        while !pending.is_empty() {
            let message = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        break;
                    }
                    match self.done_rx.recv_timeout(d - now) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.done_rx.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            let (name, ok) = message;
            if pending.remove(&name) {
                if ok {
                    report.trained.push(name);
                } else {
                    report.failed.push(name);
                }
            }
        }

        report.pending = pending.into_iter().collect();
        report.pending.extend(deferred);
        report.pending.sort();
        if !report.pending.is_empty() {
            info!(
                pending = report.pending.len(),
                "training round returned with unfinished items"
            );
        }
        Ok(report)
    }
}

/// Train one model and persist it. Returns whether the item succeeded;
/// the slot ends up `Loaded` on success and `Unloaded` (retryable) on
/// failure.
fn train_and_store<M: CacheableModel>(
    name: &str,
    slot: &Slot<M>,
    corpus: &RwLock<TrainingCorpus>,
    dir: &Path,
) -> bool {
    let mut model = M::create(name, slot.hash);
    let outcome = {
        let corpus = corpus.read();
        model.train(&corpus)
    };
    match outcome.and_then(|_| model.save(dir)) {
        Ok(()) => {
            *slot.state.write() = ModelState::Loaded(Arc::new(model));
            info!(name, "trained and persisted");
            true
        }
        Err(e) => {
            *slot.state.write() = ModelState::Unloaded;
            warn!(name, error = %e, "training failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::ThreadPoolBuilder;

    fn pool() -> Arc<ThreadPool> {
        Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap())
    }

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn manager(dir: &Path) -> ModelManager<Intent> {
        ModelManager::new(dir.to_path_buf(), pool())
    }

    #[test]
    fn test_add_rejects_empty_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        assert!(mgr.add("empty", &lines(&["", "   "])).is_err());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_train_and_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.add("greet", &lines(&["hello there", "hi friend"])).unwrap();
        mgr.add("bye", &lines(&["goodbye now", "see you"])).unwrap();

        let report = mgr.train(&TrainOptions::default(), None).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.trained.len(), 2);
        assert_eq!(mgr.loaded().len(), 2);

        // A fresh manager over the same cache reuses the persisted models.
        let mut fresh = manager(dir.path());
        fresh.add("greet", &lines(&["hello there", "hi friend"])).unwrap();
        fresh.add("bye", &lines(&["goodbye now", "see you"])).unwrap();
        let report = fresh.train(&TrainOptions::default(), None).unwrap();
        assert!(report.trained.is_empty());
        assert_eq!(report.cached, 2);
        assert_eq!(fresh.loaded().len(), 2);
    }

    #[test]
    fn test_changed_lines_invalidate_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.add("greet", &lines(&["hello there"])).unwrap();
        mgr.train(&TrainOptions::default(), None).unwrap();

        let mut fresh = manager(dir.path());
        fresh.add("greet", &lines(&["hello there", "howdy"])).unwrap();
        let report = fresh.train(&TrainOptions::default(), None).unwrap();
        assert_eq!(report.trained, vec!["greet".to_string()]);
        assert_eq!(report.cached, 0);
    }

    #[test]
    fn test_force_retrains() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.add("greet", &lines(&["hello there"])).unwrap();
        mgr.train(&TrainOptions::default(), None).unwrap();

        let opts = TrainOptions { force: true, ..TrainOptions::default() };
        let report = mgr.train(&opts, None).unwrap();
        assert_eq!(report.trained, vec!["greet".to_string()]);
    }

    #[test]
    fn test_single_thread_round() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.add("greet", &lines(&["hello there"])).unwrap();

        let opts = TrainOptions { single_thread: true, ..TrainOptions::default() };
        let report = mgr.train(&opts, None).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.trained, vec!["greet".to_string()]);
    }

    #[test]
    fn test_remove_excludes_from_matching() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path());
        mgr.add("greet", &lines(&["hello there"])).unwrap();
        mgr.train(&TrainOptions::default(), None).unwrap();
        assert_eq!(mgr.loaded().len(), 1);

        mgr.remove("greet");
        assert!(mgr.loaded().is_empty());
        assert!(mgr.is_empty());
    }
}
