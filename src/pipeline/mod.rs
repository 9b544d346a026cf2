//! Refinement Pipeline - flag, rank and apply single-word edits
//!
//! This module provides:
//! - RefinementPipeline: automatic, interactive, highlight and candidates modes
//! - Flagging and ranking policy
//! - EditApprover for the propose → approve exchange
//! - Result and report types

pub mod approval;
pub mod cancel;
pub mod policy;
pub mod refine;
pub mod types;

pub use approval::{Approval, AutoApprove, EditApprover, EditProposal, ScriptedApprover};
pub use cancel::CancelFlag;
pub use policy::{composite_score, edit_reason, flag_reasons, quality_score, rank_candidates, rank_modifications};
pub use refine::{RefineMode, RefinementPipeline};
pub use types::{
    Alternative, Candidate, CandidateReport, Edit, FlagReason, FlaggedWord, HighlightReport, HighlightedWord,
    Modification, RefinementResult, SentenceCandidates, SentenceOutcome, SentenceStatus, StopReason, TextRefinement,
};
