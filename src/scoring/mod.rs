//! Scoring Layer - entropy, rank and pseudo-log-likelihood from a masked LM
//!
//! This module provides:
//! - Distribution: log-softmax, entropy, rank and top-k over one position
//! - Scorer: batched word scoring and windowed PLL

pub mod distribution;
pub mod scorer;

pub use distribution::Distribution;
pub use scorer::{PreparedSentence, Scorer, WordScore, window};
