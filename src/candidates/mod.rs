//! Candidate Layer - replacement proposals and grammatical gating
//!
//! This module provides:
//! - CandidateGenerator: top-k masked predictions, filtered and re-cased
//! - LinguisticFilter: POS and morphology agreement in context

pub mod generator;
pub mod linguistic;

pub use generator::{CandidateGenerator, GeneratedCandidate, is_punctuation, match_case};
pub use linguistic::{AGREEMENT_FEATURES, LinguisticFilter, Rejection, morphology_conflict, pos_compatible};
