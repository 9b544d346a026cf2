//! Inference service traits and the shared model bundle

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelsConfig;

use super::http::HttpInferenceClient;
use super::types::{Encoding, EntailmentVerdict, Logits, MaskedQuery, TaggedToken, VocabToken};

/// Bidirectional masked language model plus its subword tokenizer.
#[async_trait]
pub trait MaskedLanguageModel: Send + Sync {
    /// Id substituted for masked pieces
    fn mask_token_id(&self) -> u32;

    /// Number of entries in every returned logits vector
    fn vocab_size(&self) -> usize;

    /// Split text into subword pieces with byte offsets
    async fn tokenize(&self, text: &str) -> Result<Encoding, InferenceError>;

    /// Look up surface forms for token ids (same order as `ids`)
    async fn decode(&self, ids: &[u32]) -> Result<Vec<VocabToken>, InferenceError>;

    /// One forward pass per query; returns logits for each requested position
    async fn predict(&self, queries: &[MaskedQuery]) -> Result<Vec<Vec<Logits>>, InferenceError>;
}

/// Fixed-size sentence embeddings.
#[async_trait]
pub trait SentenceEmbedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferenceError>;
}

/// Natural-language inference, premise → hypothesis.
#[async_trait]
pub trait EntailmentModel: Send + Sync {
    async fn entail(&self, premise: &str, hypothesis: &str) -> Result<EntailmentVerdict, InferenceError>;
}

/// Part-of-speech and morphology tagging.
#[async_trait]
pub trait PosTagger: Send + Sync {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError>;
}

/// Errors that can occur while talking to an inference service
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl InferenceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Unavailable(_) => true,
            InferenceError::Timeout(_) => true,
            InferenceError::ApiError { status, .. } => *status >= 500,
            InferenceError::Network(_) => true,
            InferenceError::InvalidResponse(_) => false,
            InferenceError::JsonError(_) => false,
        }
    }
}

/// The pretrained models, loaded once per process and shared read-only.
///
/// Cloning is cheap; every clone points at the same service handles.
#[derive(Clone)]
pub struct Models {
    pub masked_lm: Arc<dyn MaskedLanguageModel>,
    pub embedder: Arc<dyn SentenceEmbedder>,
    pub tagger: Arc<dyn PosTagger>,
    pub entailment: Option<Arc<dyn EntailmentModel>>,
}

impl Models {
    pub fn new(
        masked_lm: Arc<dyn MaskedLanguageModel>,
        embedder: Arc<dyn SentenceEmbedder>,
        tagger: Arc<dyn PosTagger>,
    ) -> Self {
        Self {
            masked_lm,
            embedder,
            tagger,
            entailment: None,
        }
    }

    /// Connect to the configured inference server and use it for every model.
    pub async fn connect(config: &ModelsConfig, use_nli: bool) -> Result<Self, InferenceError> {
        let client = HttpInferenceClient::connect(config.clone()).await?;
        Ok(client.into_models(use_nli))
    }

    /// Attach an entailment model for the optional NLI gate.
    pub fn with_entailment(mut self, model: Arc<dyn EntailmentModel>) -> Self {
        self.entailment = Some(model);
        self
    }
}

impl fmt::Debug for Models {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Models")
            .field("vocab_size", &self.masked_lm.vocab_size())
            .field("entailment", &self.entailment.is_some())
            .finish()
    }
}
