//! Text Layer - sentences, words and their subword alignment
//!
//! This module provides:
//! - Sentence/Word built from tagger output, immutable with offset-shifting replacement
//! - Word to subword-piece alignment for masking
//! - Unicode sentence segmentation and reassembly

pub mod align;
pub mod segment;
pub mod sentence;

pub use align::{Alignment, SubwordSpan, align};
pub use segment::{splice, split_sentences};
pub use sentence::{Sentence, Word, WordKind};
