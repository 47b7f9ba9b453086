//! Error types for the Extractor

use thiserror::Error;

/// Errors that end an extraction run
///
/// Every variant is terminal: once one is recorded no further chunks are
/// processed and the partially built document is returned alongside it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Input text is empty
    #[error("No text provided for processing")]
    NoText,

    /// Model reply could not be interpreted as a turn
    #[error("Invalid model output: {0}")]
    ModelOutput(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model call exceeded the configured timeout
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::ModelOutput(format!("Error parsing model response: {}", e))
    }
}

impl serde::Serialize for ExtractorError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
