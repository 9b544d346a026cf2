//! Candidate generation from the masked-LM distribution.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::{PreparedSentence, Scorer};

/// A surface-form replacement proposed by the model, before any gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCandidate {
    pub text: String,
    /// Model log-probability at the masked position
    pub log_prob: f64,
    /// 1-based rank at the masked position
    pub rank: usize,
}

/// Proposes single-token replacements for a word.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    scorer: Scorer,
    top_k: usize,
}

impl CandidateGenerator {
    pub fn new(scorer: Scorer, top_k: usize) -> Self {
        Self { scorer, top_k }
    }

    /// Top-k single-token predictions for `word`, filtered and re-cased.
    ///
    /// Continuation pieces, punctuation, empty tokens and the original word
    /// itself (ignoring case) are dropped. Order follows model rank.
    pub async fn generate(&self, prepared: &PreparedSentence, word: usize) -> Result<Vec<GeneratedCandidate>> {
        let original = prepared.sentence.word(word)?.text.clone();
        let original_lower = original.to_lowercase();
        let Some(dist) = self.scorer.masked_distribution(prepared, word).await? else {
            return Ok(Vec::new());
        };

        let top = dist.top_k(self.top_k);
        let ids: Vec<u32> = top.iter().map(|(id, _)| *id).collect();
        let tokens = self.scorer.model().decode(&ids).await?;

        let mut candidates: Vec<GeneratedCandidate> = Vec::new();
        for (position, ((_, log_prob), token)) in top.iter().zip(tokens).enumerate() {
            if !token.starts_word {
                continue;
            }
            let surface = token.text.trim();
            if surface.is_empty() || is_punctuation(surface) || surface.to_lowercase() == original_lower {
                continue;
            }

            let text = match_case(surface, &original);
            if candidates.iter().any(|c| c.text == text) {
                continue;
            }
            candidates.push(GeneratedCandidate {
                text,
                log_prob: *log_prob,
                rank: position + 1,
            });
        }

        log::debug!(
            "Generated {} candidates for {:?} from top {}",
            candidates.len(),
            original,
            self.top_k
        );
        Ok(candidates)
    }
}

/// True when the token has no letters or digits.
pub fn is_punctuation(text: &str) -> bool {
    !text.chars().any(char::is_alphanumeric)
}

/// Re-case `candidate` to the capitalization style of `original`.
///
/// All-caps originals (two or more letters) give all-caps, a leading capital
/// gives a capitalized candidate, anything else gives lowercase.
pub fn match_case(candidate: &str, original: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    let all_caps = letters.len() > 1 && letters.iter().all(|c| c.is_uppercase());

    if all_caps {
        return candidate.to_uppercase();
    }

    let lower = candidate.to_lowercase();
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => lower,
        }
    } else {
        lower
    }
}
