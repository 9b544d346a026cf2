//! Semantic preservation gate.
//!
//! Cosine similarity between sentence embeddings of the original and the
//! edited sentence, optionally backed by an entailment check
//! (original → edited must not be a contradiction).

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inference::{EntailmentLabel, EntailmentModel, InferenceError, SentenceEmbedder};

/// Semantic gate outcome for one edited sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticVerdict {
    pub similarity: f64,
    pub similarity_ok: bool,
    /// `None` when the entailment check is disabled
    pub entailment: Option<bool>,
}

impl SemanticVerdict {
    pub fn semantic_ok(&self) -> bool {
        self.similarity_ok && self.entailment.unwrap_or(true)
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Clone)]
pub struct SemanticChecker {
    embedder: Arc<dyn SentenceEmbedder>,
    entailment: Option<Arc<dyn EntailmentModel>>,
    min_cosine: f64,
    use_nli: bool,
}

impl SemanticChecker {
    pub fn new(
        embedder: Arc<dyn SentenceEmbedder>,
        entailment: Option<Arc<dyn EntailmentModel>>,
        min_cosine: f64,
        use_nli: bool,
    ) -> Self {
        Self {
            embedder,
            entailment,
            min_cosine,
            use_nli,
        }
    }

    pub async fn check(&self, original: &str, candidate: &str) -> Result<SemanticVerdict> {
        let verdicts = self.check_batch(original, &[candidate.to_string()]).await?;
        verdicts
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::InvalidResponse("no semantic verdict".to_string()).into())
    }

    /// Verdicts for several edited sentences with one embedding call.
    pub async fn check_batch(&self, original: &str, candidates: &[String]) -> Result<Vec<SemanticVerdict>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(original.to_string());
        texts.extend(candidates.iter().cloned());

        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(InferenceError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            ))
            .into());
        }
        let (base, rest) = embeddings.split_at(1);

        let entailment = if self.use_nli {
            let model = self
                .entailment
                .as_ref()
                .ok_or_else(|| InferenceError::Unavailable("entailment model not configured".to_string()))?;
            let verdicts = try_join_all(candidates.iter().map(|c| model.entail(original, c))).await?;
            verdicts
                .into_iter()
                .map(|v| Some(v.label != EntailmentLabel::Contradiction))
                .collect()
        } else {
            vec![None; candidates.len()]
        };

        Ok(rest
            .iter()
            .zip(entailment)
            .map(|(embedding, entailment)| {
                let similarity = cosine_similarity(&base[0], embedding);
                SemanticVerdict {
                    similarity,
                    similarity_ok: similarity >= self.min_cosine,
                    entailment,
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for SemanticChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticChecker")
            .field("min_cosine", &self.min_cosine)
            .field("use_nli", &self.use_nli)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{MockEmbedder, MockEntailment};

    fn checker(use_nli: bool) -> SemanticChecker {
        let embedder = Arc::new(MockEmbedder::new().synonyms(&["big", "large"]));
        let nli = Arc::new(MockEntailment::new().antonyms("big", "small"));
        SemanticChecker::new(embedder, Some(nli), 0.97, use_nli)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_synonym_preserves_meaning() {
        let verdict = checker(false).check("A big house.", "A large house.").await.unwrap();
        assert!((verdict.similarity - 1.0).abs() < 1e-9);
        assert!(verdict.similarity_ok);
        assert_eq!(verdict.entailment, None);
        assert!(verdict.semantic_ok());
    }

    #[tokio::test]
    async fn test_antonym_fails_with_nli() {
        let verdicts = checker(true)
            .check_batch("A big house.", &["A large house.".to_string(), "A small house.".to_string()])
            .await
            .unwrap();
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].entailment, Some(true));
        assert!(verdicts[0].semantic_ok());
        assert_eq!(verdicts[1].entailment, Some(false));
        assert!(!verdicts[1].semantic_ok());
    }

    #[tokio::test]
    async fn test_nli_without_model_is_unavailable() {
        let checker = SemanticChecker::new(Arc::new(MockEmbedder::new()), None, 0.9, true);
        let err = checker.check("a", "b").await.unwrap_err();
        assert!(err.is_inference());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let verdicts = checker(true).check_batch("A big house.", &[]).await.unwrap();
        assert!(verdicts.is_empty());
    }
}
