//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the extraction core and
//! infrastructure. Implementations live in other crates.

use crate::{ChatMessage, ChatReply};

/// Trait for language model operations
///
/// Implemented by the infrastructure layer (quill-llm). Calls are blocking
/// request/response exchanges; callers that run inside an async runtime are
/// expected to move them onto a blocking thread.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Send the conversation and return the model's reply
    ///
    /// The reply text is expected to be a single JSON object, but providers
    /// do not parse it; interpretation belongs to the caller.
    fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, Self::Error>;

    /// Name of the model answering the requests
    fn model_name(&self) -> &str;
}

/// Trait for splitting source text into ordered segments
///
/// Implemented by the application layer (quill-extractor).
pub trait Chunker {
    /// Split non-empty text into an ordered, non-empty list of chunks
    fn chunk(&self, text: &str) -> Vec<String>;
}
