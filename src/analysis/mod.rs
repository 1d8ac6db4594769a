//! Text analysis for intent parsing.
//!
//! The analysis pipeline is deliberately small: a single deterministic
//! tokenizer whose output feeds both classifier training and matching.
//! Identical input always yields identical token sequences, which the
//! hash-based model cache relies on.

pub mod tokenizer;

pub use tokenizer::{detokenize, tokenize};
