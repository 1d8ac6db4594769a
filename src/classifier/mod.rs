//! Trainable scalar-confidence classifiers.
//!
//! The matching engine is isolated from any particular numeric backend
//! through the [`Predictor`] trait: anything that can be fitted from
//! labeled feature vectors and then map a vector to a confidence in
//! `[0, 1]` is substitutable. The crate ships one backend, the small
//! [`FeedForwardNetwork`](network::FeedForwardNetwork).

pub mod network;
pub mod sample;

pub use network::{FeedForwardNetwork, StopCondition, TrainParams};
pub use sample::{TrainingSample, resolve_conflicts};

use crate::error::Result;

/// A trainable scalar-confidence predictor.
///
/// Exact numeric determinism is not required of implementations; only
/// qualitative ranking correctness: positives must come out ahead of
/// negatives after training.
pub trait Predictor: Send + Sync {
    /// Fit the predictor from labeled feature vectors.
    ///
    /// Callers are expected to run their samples through
    /// [`resolve_conflicts`] first so that duplicate feature vectors
    /// cannot carry contradictory targets.
    fn train(&mut self, samples: &[TrainingSample]) -> Result<()>;

    /// Map a feature vector to a confidence, nominally in `[0, 1]`.
    fn predict(&self, input: &[f64]) -> f64;
}
