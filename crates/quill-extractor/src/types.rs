//! Request and response types for extraction

use crate::error::ExtractorError;
use crate::guidance::Guidance;
use quill_domain::Usage;
use serde::Serialize;
use serde_json::Value;

/// Request to build a JSON document from text
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Text to extract from
    pub text: String,

    /// Optional JSON schema shown to the model as advisory context
    pub target_schema: Option<Value>,
}

impl ExtractionRequest {
    /// Request without a target schema
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_schema: None,
        }
    }

    /// Attach a target schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.target_schema = Some(schema);
        self
    }
}

/// Result of an extraction run
///
/// A failed run still carries the document as it stood when the error
/// occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Document built by the run
    pub json_document: Value,

    /// Metadata about the run
    pub metadata: ExtractionMetadata,

    /// Fatal error that ended the run early
    pub error: Option<ExtractorError>,
}

impl ExtractionResult {
    /// Whether every chunk was processed
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Metadata about an extraction run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionMetadata {
    /// Run identifier
    pub run_id: String,

    /// Number of chunks the text was split into
    pub total_chunks: usize,

    /// Baton left by the last finalized chunk
    pub final_guidance: Option<Guidance>,

    /// Name of the LLM model used
    pub model_name: String,

    /// Model calls across all chunks
    pub model_calls: usize,

    /// Chunks ended by the iteration cap instead of a finalize action
    pub forced_finalizations: usize,

    /// Tokens consumed across all model calls
    pub token_usage: TokenUsage,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Token totals for a run
///
/// Only replies whose backend reported usage are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Tokens sent to the model
    pub prompt_tokens: u64,
    /// Tokens generated by the model
    pub completion_tokens: u64,
    /// Sum of both
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Totals after adding one reply's usage
    pub fn plus(self, usage: Usage) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + usage.prompt_tokens,
            completion_tokens: self.completion_tokens + usage.completion_tokens,
            total_tokens: self.total_tokens + usage.total(),
        }
    }
}
