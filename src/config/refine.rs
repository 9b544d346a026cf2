//! Refinement thresholds consumed by the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// How multi-piece words are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PllMethod {
    /// Mask the current piece and every piece to its right
    #[default]
    #[serde(rename = "word-l2r")]
    WordL2r,
    /// Mask only the current piece
    #[serde(rename = "standard")]
    Standard,
}

/// Thresholds and budgets for one refinement run.
///
/// All thresholds are inclusive (`>=`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Flag words whose masked-position entropy reaches this many bits.
    #[serde(rename = "min-entropy")]
    pub min_entropy: f64,

    /// Flag words whose original token ranks at or below this position.
    #[serde(rename = "max-original-rank")]
    pub max_original_rank: usize,

    /// Required windowed PLL improvement (natural-log units).
    #[serde(rename = "min-pll-gain")]
    pub min_pll_gain: f64,

    /// Required cosine similarity between original and edited sentence.
    #[serde(rename = "min-sbert-cosine")]
    pub min_sbert_cosine: f64,

    /// PLL window radius, in words, around the edited word.
    #[serde(rename = "pll-window-size")]
    pub pll_window_size: usize,

    /// Edit budget per sentence.
    #[serde(rename = "max-edits-per-sentence")]
    pub max_edits_per_sentence: usize,

    /// Fill-mask predictions considered per flagged word.
    #[serde(rename = "top-k-candidates")]
    pub top_k_candidates: usize,

    /// Candidates surviving the linguistic filter that get PLL/semantic scoring.
    #[serde(rename = "max-scored-candidates")]
    pub max_scored_candidates: usize,

    /// Require the entailment gate in addition to cosine similarity.
    #[serde(rename = "use-nli-check")]
    pub use_nli_check: bool,

    #[serde(rename = "pll-method")]
    pub pll_method: PllMethod,

    /// Enforce agreement of Number/Tense/Person/Mood/VerbForm.
    #[serde(rename = "strict-morphology")]
    pub strict_morphology: bool,

    /// Weight of PLL gain in the composite ranking score.
    #[serde(rename = "pll-gain-weight")]
    pub pll_gain_weight: f64,

    /// Weight of similarity in the composite ranking score.
    #[serde(rename = "similarity-weight")]
    pub similarity_weight: f64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            min_entropy: 4.0,
            max_original_rank: 50,
            min_pll_gain: 2.0,
            min_sbert_cosine: 0.97,
            pll_window_size: 5,
            max_edits_per_sentence: 2,
            top_k_candidates: 20,
            max_scored_candidates: 10,
            use_nli_check: false,
            pll_method: PllMethod::WordL2r,
            strict_morphology: true,
            pll_gain_weight: 1.0,
            similarity_weight: 0.0,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<()> {
        // Zero bits or rank 1 would flag every confident word
        if !(self.min_entropy > 0.0) {
            return Err(FlowError::InvalidConfig("min_entropy must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_sbert_cosine) {
            return Err(FlowError::InvalidConfig("min_sbert_cosine must be in [0, 1]".to_string()));
        }
        if self.pll_window_size < 1 {
            return Err(FlowError::InvalidConfig("pll_window_size must be positive".to_string()));
        }
        if self.top_k_candidates == 0 {
            return Err(FlowError::InvalidConfig("top_k_candidates must be positive".to_string()));
        }
        if self.max_original_rank < 2 {
            return Err(FlowError::InvalidConfig("max_original_rank must be at least 2".to_string()));
        }
        if !self.min_pll_gain.is_finite() {
            return Err(FlowError::InvalidConfig("min_pll_gain must be finite".to_string()));
        }
        Ok(())
    }
}
