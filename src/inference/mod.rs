//! Inference Layer - pretrained model services behind async traits
//!
//! This module provides:
//! - Request/response types shared by every model
//! - Traits for the masked LM, embedder, entailment model and tagger
//! - HttpInferenceClient talking to a model server
//! - Deterministic mocks for tests and offline runs

pub mod client;
pub mod http;
pub mod mock;
pub mod types;

pub use client::{EntailmentModel, InferenceError, MaskedLanguageModel, Models, PosTagger, SentenceEmbedder};
pub use http::HttpInferenceClient;
pub use mock::{MockEmbedder, MockEntailment, MockMaskedLm, MockTagger};
pub use types::{
    Encoding, EntailmentLabel, EntailmentVerdict, Logits, MaskedQuery, Morphology, Piece, Pos, Span, TaggedToken,
    VocabToken,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _pos = Pos::Noun;
        let _label = EntailmentLabel::Neutral;
        let _span = Span::new(0, 1);
    }
}
