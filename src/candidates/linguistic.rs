//! Part-of-speech and morphology agreement filter.
//!
//! A candidate is tagged in context (substituted into the sentence) and kept
//! only when its coarse tag and agreement features match the original word.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;

use super::generator::GeneratedCandidate;
use crate::error::Result;
use crate::inference::{Morphology, Pos, PosTagger, Span, TaggedToken};
use crate::text::{Sentence, Word, WordKind};

/// Features that must agree when both words carry them.
pub const AGREEMENT_FEATURES: [&str; 5] = ["Number", "Tense", "Person", "Mood", "VerbForm"];

/// Why a candidate was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The original word is not an edit target
    NotEditable(WordKind),
    PosMismatch { original: Pos, candidate: Pos },
    FeatureMismatch { feature: &'static str },
    ProperNoun,
    Numeral,
    /// Tagger did not produce a token covering the candidate
    Untagged,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotEditable(kind) => write!(f, "original is {:?}", kind),
            Rejection::PosMismatch { original, candidate } => write!(f, "POS {} != {}", candidate, original),
            Rejection::FeatureMismatch { feature } => write!(f, "{} disagrees", feature),
            Rejection::ProperNoun => write!(f, "proper noun"),
            Rejection::Numeral => write!(f, "numeral"),
            Rejection::Untagged => write!(f, "no tag in context"),
        }
    }
}

/// Coarse categories that may stand in for each other.
pub fn pos_compatible(original: Pos, candidate: Pos) -> bool {
    original == candidate || matches!((original, candidate), (Pos::Adj, Pos::Adv) | (Pos::Adv, Pos::Adj))
}

/// First agreement feature present on both sides with different values.
pub fn morphology_conflict(original: &Morphology, candidate: &Morphology) -> Option<&'static str> {
    AGREEMENT_FEATURES.into_iter().find(|feature| {
        matches!(
            (original.get(*feature), candidate.get(*feature)),
            (Some(a), Some(b)) if a != b
        )
    })
}

/// Drops candidates whose grammar disagrees with the original word.
#[derive(Clone)]
pub struct LinguisticFilter {
    tagger: Arc<dyn PosTagger>,
    strict_morphology: bool,
}

impl LinguisticFilter {
    pub fn new(tagger: Arc<dyn PosTagger>, strict_morphology: bool) -> Self {
        Self {
            tagger,
            strict_morphology,
        }
    }

    /// Keep candidates that agree with word `index` of `sentence`.
    ///
    /// Each candidate sentence is tagged concurrently; order is preserved.
    pub async fn filter(
        &self,
        sentence: &Sentence,
        index: usize,
        candidates: Vec<GeneratedCandidate>,
    ) -> Result<Vec<GeneratedCandidate>> {
        let original = sentence.word(index)?;
        if candidates.is_empty() {
            return Ok(candidates);
        }
        if !original.is_editable() {
            log::debug!("Skipping filter for {:?}: {}", original.text, Rejection::NotEditable(original.kind));
            return Ok(Vec::new());
        }

        let substituted = candidates
            .iter()
            .map(|c| sentence.with_replacement(index, &c.text))
            .collect::<Result<Vec<Sentence>>>()?;
        let taggings = try_join_all(substituted.iter().map(|s| self.tagger.tag(s.text()))).await?;

        let start = original.span.start;
        let mut kept = Vec::with_capacity(candidates.len());
        for (candidate, tokens) in candidates.into_iter().zip(taggings) {
            let expected = Span::new(start, start + candidate.text.len());
            let tagged = tokens.iter().find(|t| t.span == expected);

            match self.check(original, tagged) {
                Ok(()) => kept.push(candidate),
                Err(reason) => {
                    tracing::debug!(
                        original = %original.text,
                        candidate = %candidate.text,
                        reason = %reason,
                        "Linguistic filter rejected candidate"
                    );
                }
            }
        }

        Ok(kept)
    }

    /// Agreement check of one tagged candidate against the original word.
    pub fn check(&self, original: &Word, candidate: Option<&TaggedToken>) -> std::result::Result<(), Rejection> {
        let candidate = candidate.ok_or(Rejection::Untagged)?;

        if candidate.pos == Pos::Propn {
            return Err(Rejection::ProperNoun);
        }
        if candidate.like_num || candidate.pos == Pos::Num {
            return Err(Rejection::Numeral);
        }
        if !pos_compatible(original.pos, candidate.pos) {
            return Err(Rejection::PosMismatch {
                original: original.pos,
                candidate: candidate.pos,
            });
        }
        if self.strict_morphology {
            if let Some(feature) = morphology_conflict(&original.morph, &candidate.morph) {
                return Err(Rejection::FeatureMismatch { feature });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LinguisticFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinguisticFilter")
            .field("strict_morphology", &self.strict_morphology)
            .finish()
    }
}
