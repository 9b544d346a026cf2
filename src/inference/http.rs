//! HTTP inference client
//!
//! Implements every inference trait against a model server exposing a small
//! JSON API. The server owns the pretrained weights; this side only ships
//! texts and token ids.
//!
//! | Endpoint          | Request                                 | Response                           |
//! |-------------------|-----------------------------------------|------------------------------------|
//! | `GET  /health`    | -                                       | `{mask_token_id, vocab_size}`      |
//! | `POST /tokenize`  | `{model, text}`                         | `{pieces: [{id, span}]}`           |
//! | `POST /decode`    | `{model, ids}`                          | `{tokens: [{text, starts_word}]}`  |
//! | `POST /predict`   | `{model, queries: [{input_ids, positions}]}` | `{logits: [[[f32]]]}`         |
//! | `POST /embed`     | `{model, texts}`                        | `{embeddings: [[f32]]}`            |
//! | `POST /entail`    | `{model, premise, hypothesis}`          | `{label, confidence}`              |
//! | `POST /tag`       | `{model, text}`                         | `{tokens: [TaggedToken]}`          |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::client::{EntailmentModel, InferenceError, MaskedLanguageModel, Models, PosTagger, SentenceEmbedder};
use super::types::{Encoding, EntailmentVerdict, Logits, MaskedQuery, Piece, TaggedToken, VocabToken};
use crate::config::ModelsConfig;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    mask_token_id: u32,
    vocab_size: usize,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    pieces: Vec<Piece>,
}

#[derive(Debug, Deserialize)]
struct DecodeResponse {
    tokens: Vec<VocabToken>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    logits: Vec<Vec<Logits>>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    tokens: Vec<TaggedToken>,
}

/// Client for a remote model server
pub struct HttpInferenceClient {
    client: Client,
    config: ModelsConfig,
    mask_token_id: u32,
    vocab_size: usize,
}

impl HttpInferenceClient {
    /// Build the client and confirm the server is up.
    ///
    /// The health probe also fixes the mask id and vocabulary size, which
    /// never change for the lifetime of the process.
    pub async fn connect(config: ModelsConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let url = format!("{}/health", config.endpoint.trim_end_matches('/'));
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(format!("{}: {}", url, e)))?;

        let health: HealthResponse = Self::read_json(response, config.timeout_ms).await?;
        log::info!(
            "Connected to inference server at {} (vocab={}, mask={})",
            config.endpoint,
            health.vocab_size,
            health.mask_token_id
        );

        Ok(Self {
            client,
            config,
            mask_token_id: health.mask_token_id,
            vocab_size: health.vocab_size,
        })
    }

    /// Bundle this client as every model, entailment included when asked.
    pub fn into_models(self, use_nli: bool) -> Models {
        let shared = Arc::new(self);
        let models = Models::new(shared.clone(), shared.clone(), shared.clone());
        if use_nli { models.with_entailment(shared) } else { models }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, InferenceError> {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path);
        log::debug!("POST {}", url);

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(Duration::from_millis(self.config.timeout_ms))
            } else if e.is_connect() {
                InferenceError::Unavailable(format!("{}: {}", url, e))
            } else {
                InferenceError::Network(e)
            }
        })?;

        Self::read_json(response, self.config.timeout_ms).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, timeout_ms: u64) -> Result<T, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InferenceError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(Duration::from_millis(timeout_ms))
            } else {
                InferenceError::Network(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl MaskedLanguageModel for HttpInferenceClient {
    fn mask_token_id(&self) -> u32 {
        self.mask_token_id
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    async fn tokenize(&self, text: &str) -> Result<Encoding, InferenceError> {
        let body = json!({ "model": self.config.masked_lm, "text": text });
        let response: TokenizeResponse = self.post("tokenize", body).await?;
        Ok(Encoding {
            pieces: response.pieces,
        })
    }

    async fn decode(&self, ids: &[u32]) -> Result<Vec<VocabToken>, InferenceError> {
        let body = json!({ "model": self.config.masked_lm, "ids": ids });
        let response: DecodeResponse = self.post("decode", body).await?;
        if response.tokens.len() != ids.len() {
            return Err(InferenceError::InvalidResponse(format!(
                "decode returned {} tokens for {} ids",
                response.tokens.len(),
                ids.len()
            )));
        }
        Ok(response.tokens)
    }

    async fn predict(&self, queries: &[MaskedQuery]) -> Result<Vec<Vec<Logits>>, InferenceError> {
        let body = json!({ "model": self.config.masked_lm, "queries": queries });
        let response: PredictResponse = self.post("predict", body).await?;
        if response.logits.len() != queries.len() {
            return Err(InferenceError::InvalidResponse(format!(
                "predict returned {} results for {} queries",
                response.logits.len(),
                queries.len()
            )));
        }
        for (query, positions) in queries.iter().zip(&response.logits) {
            if positions.len() != query.positions.len() {
                return Err(InferenceError::InvalidResponse("position count mismatch".to_string()));
            }
            if positions.iter().any(|l| l.len() != self.vocab_size) {
                return Err(InferenceError::InvalidResponse("logits length differs from vocab size".to_string()));
            }
        }
        Ok(response.logits)
    }
}

#[async_trait]
impl SentenceEmbedder for HttpInferenceClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, InferenceError> {
        let body = json!({ "model": self.config.embedding, "texts": texts });
        let response: EmbedResponse = self.post("embed", body).await?;
        if response.embeddings.len() != texts.len() {
            return Err(InferenceError::InvalidResponse("embedding count mismatch".to_string()));
        }
        Ok(response.embeddings)
    }
}

#[async_trait]
impl EntailmentModel for HttpInferenceClient {
    async fn entail(&self, premise: &str, hypothesis: &str) -> Result<EntailmentVerdict, InferenceError> {
        let body = json!({
            "model": self.config.entailment,
            "premise": premise,
            "hypothesis": hypothesis
        });
        self.post("entail", body).await
    }
}

#[async_trait]
impl PosTagger for HttpInferenceClient {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedToken>, InferenceError> {
        let body = json!({ "model": self.config.tagger, "text": text });
        let response: TagResponse = self.post("tag", body).await?;
        Ok(response.tokens)
    }
}

impl std::fmt::Debug for HttpInferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInferenceClient")
            .field("endpoint", &self.config.endpoint)
            .field("masked_lm", &self.config.masked_lm)
            .field("vocab_size", &self.vocab_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_unreachable_is_unavailable() {
        let config = ModelsConfig {
            // Port 9 (discard) on localhost is never an inference server
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..Default::default()
        };
        let err = HttpInferenceClient::connect(config).await.unwrap_err();
        assert!(matches!(err, InferenceError::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_predict_response_parsing() {
        let json = r#"{"logits": [[[0.1, 0.2, 0.3]], [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]}"#;
        let response: PredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.logits.len(), 2);
        assert_eq!(response.logits[1].len(), 2);
    }

    #[test]
    fn test_tokenize_response_parsing() {
        let json = r#"{"pieces": [{"id": 0, "span": null}, {"id": 713, "span": {"start": 0, "end": 3}}]}"#;
        let response: TokenizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.pieces.len(), 2);
        assert!(response.pieces[0].span.is_none());
        assert_eq!(response.pieces[1].id, 713);
    }
}
