//! Pipeline data types: candidates, edits, results and reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::candidates::GeneratedCandidate;
use crate::inference::Span;
use crate::scoring::WordScore;
use crate::semantic::SemanticVerdict;

/// Why a word was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagReason {
    HighUncertainty { entropy: f64 },
    LowRank { rank: usize },
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagReason::HighUncertainty { entropy } => write!(f, "high uncertainty (H={:.1} bits)", entropy),
            FlagReason::LowRank { rank } => write!(f, "low rank (#{})", rank),
        }
    }
}

/// A word selected for candidate ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedWord {
    pub index: usize,
    pub text: String,
    pub span: Span,
    pub score: WordScore,
    pub reasons: Vec<FlagReason>,
}

/// A fully scored replacement for one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    /// Model log-probability at the masked position
    pub log_prob: f64,
    /// Model rank at the masked position
    pub rank: usize,
    /// Windowed PLL with the candidate minus the baseline
    pub pll_gain: f64,
    pub similarity: f64,
    /// `None` when the entailment check is disabled
    pub entailment: Option<bool>,
    pub fluency_ok: bool,
    pub similarity_ok: bool,
    pub passes_thresholds: bool,
}

impl Candidate {
    /// Attach gate results; `passes_thresholds` requires every gate.
    pub fn evaluate(generated: GeneratedCandidate, pll_gain: f64, verdict: SemanticVerdict, min_pll_gain: f64) -> Self {
        let fluency_ok = pll_gain >= min_pll_gain;
        Self {
            text: generated.text,
            log_prob: generated.log_prob,
            rank: generated.rank,
            pll_gain,
            similarity: verdict.similarity,
            entailment: verdict.entailment,
            fluency_ok,
            similarity_ok: verdict.similarity_ok,
            passes_thresholds: fluency_ok && verdict.semantic_ok(),
        }
    }
}

/// Runner-up replacement kept on an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    pub pll_gain: f64,
}

impl From<&Candidate> for Alternative {
    fn from(candidate: &Candidate) -> Self {
        Self {
            text: candidate.text.clone(),
            pll_gain: candidate.pll_gain,
        }
    }
}

/// An accepted substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub word_index: usize,
    pub original: String,
    pub replacement: String,
    /// Byte range of the replacement in the refined sentence
    pub span: Span,
    pub reason: String,
    pub pll_gain: f64,
    pub similarity: f64,
    pub alternatives: Vec<Alternative>,
}

/// Why edit selection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every flagged word was visited
    Exhausted,
    /// The per-sentence edit budget was reached
    BudgetExhausted,
}

/// Outcome of refining one sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub original: String,
    pub refined: String,
    pub edits: Vec<Edit>,
    /// Scores of the original sentence's words
    pub scores: Vec<WordScore>,
    /// Word indices with no subword alignment
    pub excluded: Vec<usize>,
    pub stop_reason: StopReason,
}

impl RefinementResult {
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }
}

/// One flagged word in a highlight report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedWord {
    pub text: String,
    pub span: Span,
    pub entropy: f64,
    pub rank: usize,
    pub log_prob: f64,
    pub reasons: Vec<FlagReason>,
    /// Best candidates first; may be empty
    pub suggestions: Vec<Candidate>,
}

/// Non-mutating analysis of a whole text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightReport {
    pub text: String,
    pub sentence_count: usize,
    pub total_highlighted: usize,
    pub words: Vec<HighlightedWord>,
}

/// One single-word change in a candidates report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub word_index: usize,
    pub original: String,
    pub replacement: String,
    /// Byte range of the original word
    pub span: Span,
    /// The sentence with only this change applied
    pub modified: String,
    /// Entropy and rank of the original word
    pub entropy: f64,
    pub rank: usize,
    /// Model log-probability of the replacement
    pub log_prob: f64,
    pub pll_gain: f64,
    pub similarity: f64,
    pub quality: f64,
    pub passes_thresholds: bool,
}

/// Most promising changes for one sentence, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceCandidates {
    /// Byte range of the sentence in the text
    pub span: Span,
    pub sentence: String,
    pub modifications: Vec<Modification>,
}

/// Candidate changes across a whole text; never edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub text: String,
    pub sentences: Vec<SentenceCandidates>,
}

impl CandidateReport {
    pub fn total_modifications(&self) -> usize {
        self.sentences.iter().map(|s| s.modifications.len()).sum()
    }
}

/// Per-sentence outcome inside a text refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SentenceStatus {
    Refined(RefinementResult),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceOutcome {
    /// Byte range of the sentence in the original text
    pub span: Span,
    pub status: SentenceStatus,
}

impl SentenceOutcome {
    pub fn result(&self) -> Option<&RefinementResult> {
        match &self.status {
            SentenceStatus::Refined(result) => Some(result),
            SentenceStatus::Failed { .. } => None,
        }
    }
}

/// Refinement of a multi-sentence text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRefinement {
    pub original: String,
    pub refined: String,
    pub sentences: Vec<SentenceOutcome>,
}

impl TextRefinement {
    pub fn edits(&self) -> impl Iterator<Item = &Edit> {
        self.sentences.iter().filter_map(|s| s.result()).flat_map(|r| r.edits.iter())
    }

    pub fn failures(&self) -> usize {
        self.sentences.iter().filter(|s| s.result().is_none()).count()
    }
}
