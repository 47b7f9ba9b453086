//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local `/api/chat` endpoint, requesting
//! `format: "json"` so the model answers with a single JSON object.
//!
//! # Features
//!
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use quill_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! ```

use crate::retry::{status_error, with_backoff, DEFAULT_MAX_RETRIES};
use crate::LlmError;
use quill_domain::traits::LlmProvider as LlmProviderTrait;
use quill_domain::{ChatMessage, ChatReply, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ollama API provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    num_predict: u32,
}

/// Request body for Ollama chat API
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

/// Response from Ollama chat API
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaReply,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaChatResponse {
    fn into_reply(self) -> ChatReply {
        let reply = ChatReply::new(self.message.content);
        if self.prompt_eval_count.is_none() && self.eval_count.is_none() {
            return reply;
        }
        reply.with_usage(Usage::new(
            self.prompt_eval_count.unwrap_or(0),
            self.eval_count.unwrap_or(0),
        ))
    }
}

#[derive(Deserialize)]
struct OllamaReply {
    content: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            num_predict: None,
        }
    }

    /// Create a new Ollama provider on `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap the number of generated tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.num_predict = Some(max_tokens);
        self
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
            format: "json",
            options: self.num_predict.map(|num_predict| ChatOptions { num_predict }),
        }
    }

    fn send_once(&self, client: &reqwest::blocking::Client, body: &OllamaChatRequest<'_>) -> Result<ChatReply, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        let response = client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, text, &self.model));
        }

        response
            .json::<OllamaChatResponse>()
            .map(OllamaChatResponse::into_reply)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

impl LlmProviderTrait for OllamaProvider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, Self::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;
        let body = self.request_body(messages);

        debug!(model = %self.model, messages = messages.len(), "ollama chat request");
        with_backoff(self.max_retries, || self.send_once(&client, &body))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
