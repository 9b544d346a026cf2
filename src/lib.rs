//! Flow - masked-LM text refinement
//!
//! Flow scores each word of a sentence with a bidirectional masked language
//! model, flags the words the model finds surprising, and proposes
//! single-word replacements that read more fluently without changing the
//! meaning. Edits can be applied automatically, confirmed one at a time, or
//! only reported.

pub mod candidates;
pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod scoring;
pub mod semantic;
pub mod text;

pub use error::{FlowError, Result};
