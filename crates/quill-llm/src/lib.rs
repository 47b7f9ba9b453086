//! Quill LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `quill-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Scripted replies for testing, records every request
//! - `OpenAiProvider`: OpenAI-compatible chat completions in JSON mode
//! - `OllamaProvider`: Local Ollama `/api/chat` in JSON mode
//!
//! `ProviderConfig` selects and builds one of the network providers.
//!
//! # Examples
//!
//! ```
//! use quill_llm::MockProvider;
//! use quill_domain::{ChatMessage, traits::LlmProvider};
//!
//! let provider = MockProvider::new(r#"{"think": "", "actions": []}"#);
//! provider.push_response(r#"{"think": "first", "actions": []}"#);
//!
//! let messages = [ChatMessage::user("hello")];
//! assert_eq!(provider.chat(&messages).unwrap().content, r#"{"think": "first", "actions": []}"#);
//! assert_eq!(provider.chat(&messages).unwrap().content, r#"{"think": "", "actions": []}"#);
//! assert_eq!(provider.call_count(), 2);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod ollama;
pub mod openai;
mod retry;

use quill_domain::traits::LlmProvider as LlmProviderTrait;
use quill_domain::{ChatMessage, ChatReply, Usage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use config::{Provider, ProviderConfig, ProviderKind};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// API key environment variable is unset or empty
    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Communication(_) | LlmError::RateLimitExceeded)
    }
}

type Scripted = Result<ChatReply, LlmError>;

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Scripted>,
    requests: Vec<Vec<ChatMessage>>,
    call_count: usize,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are taken from a script in order; once the script runs out the
/// default reply is returned for every call. Clones share the script, the
/// recorded requests and the call count.
///
/// # Examples
///
/// ```
/// use quill_llm::{LlmError, MockProvider};
/// use quill_domain::{ChatMessage, traits::LlmProvider};
///
/// let provider = MockProvider::default();
/// provider.push_error(LlmError::RateLimitExceeded);
///
/// assert!(provider.chat(&[ChatMessage::user("x")]).is_err());
/// assert_eq!(provider.requests()[0][0].content, "x");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    delay: Option<Duration>,
    usage: Option<Usage>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a MockProvider that answers every call with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            delay: None,
            usage: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a MockProvider that replays `responses` in order
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::default();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report `usage` on every reply that carries none of its own
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Queue a reply
    pub fn push_response(&self, response: impl Into<String>) {
        self.push_reply(ChatReply::new(response));
    }

    /// Queue a reply with explicit usage
    pub fn push_reply(&self, reply: ChatReply) {
        self.lock().script.push_back(Ok(reply));
    }

    /// Queue a failure
    pub fn push_error(&self, error: LlmError) {
        self.lock().script.push_back(Err(error));
    }

    /// Get the number of times chat was called
    pub fn call_count(&self) -> usize {
        self.lock().call_count
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.lock().call_count = 0;
    }

    /// Every conversation sent so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.lock().requests.clone()
    }

    /// Number of scripted replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().script.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(r#"{"think": "nothing to do", "actions": [{"action": "update_guidance", "input": {}}]}"#)
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, Self::Error> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        state.call_count += 1;
        state.requests.push(messages.to_vec());
        let mut reply = state
            .script
            .pop_front()
            .unwrap_or_else(|| Ok(ChatReply::new(self.default_response.clone())))?;
        if reply.usage.is_none() {
            reply.usage = self.usage;
        }
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
