//! Error types for Flow
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::inference::InferenceError;

/// All error types that can abort a refinement.
///
/// Alignment failures and empty candidate lists are not errors: they are
/// recorded on the sentence or the report and the word is skipped.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A backing model call failed or timed out
    #[error("Inference unavailable: {0}")]
    InferenceUnavailable(#[from] InferenceError),

    /// Configuration rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Refinement was cancelled between words
    #[error("Refinement cancelled after {edits_applied} edit(s)")]
    Cancelled { edits_applied: usize },

    /// An approver picked an alternative that was never offered
    #[error("Invalid approval: alternative {index} out of {available}")]
    InvalidApproval { index: usize, available: usize },

    /// A word index outside the sentence
    #[error("Word index {index} out of range for sentence with {len} words")]
    WordOutOfRange { index: usize, len: usize },
}

impl FlowError {
    /// Whether this error came from an external model.
    pub fn is_inference(&self) -> bool {
        matches!(self, FlowError::InferenceUnavailable(_))
    }
}

/// Result type alias for Flow operations
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_conversion() {
        let err: FlowError = InferenceError::Unavailable("embedder offline".to_string()).into();
        assert!(err.is_inference());
        assert_eq!(err.to_string(), "Inference unavailable: Service unavailable: embedder offline");
    }

    #[test]
    fn test_invalid_config_error() {
        let err = FlowError::InvalidConfig("pll_window_size must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid config: pll_window_size must be positive");
        assert!(!err.is_inference());
    }

    #[test]
    fn test_cancelled_error() {
        let err = FlowError::Cancelled { edits_applied: 1 };
        assert_eq!(err.to_string(), "Refinement cancelled after 1 edit(s)");
    }

    #[test]
    fn test_invalid_approval_error() {
        let err = FlowError::InvalidApproval { index: 4, available: 3 };
        assert_eq!(err.to_string(), "Invalid approval: alternative 4 out of 3");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(FlowError::WordOutOfRange { index: 9, len: 3 })
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
