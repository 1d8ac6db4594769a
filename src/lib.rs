//! # Parlance
//!
//! An offline, trainable intent parser for Rust.
//!
//! Parlance classifies short natural-language utterances into registered
//! intents and extracts named entity spans, training small confidence
//! classifiers from a handful of example sentences per intent. A
//! deterministic exact-match fast path is layered over the probabilistic
//! classifiers for guaranteed (confidence 1.0) hits.
//!
//! ## Features
//!
//! - Fully offline: no models to download, trains in seconds on-device
//! - Entity extraction via boundary-pair span search
//! - Hash-based model caching with transparent reload
//! - Parallel, timeout-bounded training with partial-failure semantics
//!
//! ## Example
//!
//! ```no_run
//! use parlance::container::{IntentContainer, TrainOptions};
//!
//! # fn main() -> parlance::error::Result<()> {
//! let mut container = IntentContainer::new("intent_cache")?;
//! container.add_intent("hello", &["hello".into(), "hi there".into()])?;
//! container.add_intent("goodbye", &["goodbye".into(), "see you later".into()])?;
//! container.train(TrainOptions::default())?;
//!
//! let result = container.calc_intent("hi there");
//! assert_eq!(result.name, "hello");
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod classifier;
pub mod container;
pub mod corpus;
pub mod entity;
pub mod error;
pub mod exact;
pub mod intent;
pub mod matching;
pub mod util;
pub mod vocab;

pub mod prelude {
    pub use crate::container::{IntentContainer, TrainOptions, TrainReport};
    pub use crate::error::{ParlanceError, Result};
    pub use crate::matching::MatchResult;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
