//! Provider selection from configuration

use crate::{LlmError, OllamaProvider, OpenAiProvider};
use quill_domain::traits::LlmProvider as LlmProviderTrait;
use quill_domain::{ChatMessage, ChatReply};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Model provider settings, the `[provider]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend
    pub kind: ProviderKind,
    /// Model name
    pub model: String,
    /// Base URL; the backend default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Completion budget per reply
    pub max_tokens: u32,
    /// HTTP timeout per request
    pub timeout_secs: u64,
    /// Attempts per request
    pub max_retries: u32,
    /// Environment variable holding the API key (OpenAI only)
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            model: crate::openai::DEFAULT_MODEL.to_string(),
            endpoint: None,
            max_tokens: crate::openai::DEFAULT_MAX_TOKENS,
            timeout_secs: crate::openai::DEFAULT_TIMEOUT_SECS,
            max_retries: crate::retry::DEFAULT_MAX_RETRIES,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Longest a single `chat` call can take when every attempt times out,
    /// backoff sleeps included.
    pub fn max_call_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs) * self.max_retries.max(1) + crate::retry::total_backoff(self.max_retries)
    }

    /// Construct the configured provider.
    ///
    /// # Errors
    ///
    /// `LlmError::MissingApiKey` for OpenAI when the key variable is unset.
    pub fn build(&self) -> Result<Provider, LlmError> {
        let timeout = Duration::from_secs(self.timeout_secs);
        match self.kind {
            ProviderKind::OpenAi => {
                let mut provider = OpenAiProvider::from_env(&self.api_key_env, self.model.clone())?
                    .with_max_tokens(self.max_tokens)
                    .with_timeout(timeout)
                    .with_max_retries(self.max_retries);
                if let Some(endpoint) = &self.endpoint {
                    provider = provider.with_endpoint(endpoint.clone());
                }
                Ok(Provider::OpenAi(provider))
            }
            ProviderKind::Ollama => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| crate::ollama::DEFAULT_ENDPOINT.to_string());
                Ok(Provider::Ollama(
                    OllamaProvider::new(endpoint, self.model.clone())
                        .with_max_tokens(self.max_tokens)
                        .with_timeout(timeout)
                        .with_max_retries(self.max_retries),
                ))
            }
        }
    }
}

/// A provider chosen at runtime
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible backend
    OpenAi(OpenAiProvider),
    /// Ollama backend
    Ollama(OllamaProvider),
}

impl LlmProviderTrait for Provider {
    type Error = LlmError;

    fn chat(&self, messages: &[ChatMessage]) -> Result<ChatReply, Self::Error> {
        match self {
            Provider::OpenAi(p) => p.chat(messages),
            Provider::Ollama(p) => p.chat(messages),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Provider::OpenAi(p) => p.model_name(),
            Provider::Ollama(p) => p.model_name(),
        }
    }
}
