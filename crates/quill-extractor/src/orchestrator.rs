//! Chunk orchestrator: drives the state machine to completion

use crate::chunking::TextChunker;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::state::{Phase, RunState};
use crate::transitions;
use crate::types::{ExtractionMetadata, ExtractionRequest, ExtractionResult};
use quill_domain::traits::{Chunker, LlmProvider};
use quill_domain::{ChatMessage, ChatReply, RunId};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// The Extractor turns text into a JSON document, one chunk at a time
pub struct Extractor<L, C = TextChunker>
where
    L: LlmProvider,
{
    llm_provider: Arc<L>,
    chunker: C,
    config: ExtractorConfig,
}

impl<L> Extractor<L>
where
    L: LlmProvider,
{
    /// Create a new Extractor using the default [`TextChunker`]
    pub fn new(llm_provider: L, config: ExtractorConfig) -> Self {
        let chunker = TextChunker::new(config.chunk_strategy, config.max_chunk_size);
        Self {
            llm_provider: Arc::new(llm_provider),
            chunker,
            config,
        }
    }
}

impl<L, C> Extractor<L, C>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: std::fmt::Display,
    C: Chunker,
{
    /// Replace the chunker
    pub fn with_chunker<C2: Chunker>(self, chunker: C2) -> Extractor<L, C2> {
        Extractor {
            llm_provider: self.llm_provider,
            chunker,
            config: self.config,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run the extraction loop over `request.text`.
    ///
    /// Never fails as a whole: a fatal error stops the loop and is returned
    /// in [`ExtractionResult::error`] together with the document built so far.
    pub async fn extract(&self, request: ExtractionRequest) -> ExtractionResult {
        let start_time = Instant::now();
        let run_id = RunId::new();
        let model_name = self.llm_provider.model_name().to_string();

        info!(
            run_id = %run_id,
            model = %model_name,
            text_len = request.text.len(),
            "Starting extraction"
        );

        let mut state = RunState::new(
            request.text,
            request.target_schema,
            self.config.max_iterations_per_chunk,
        );
        if let Err(e) = self.config.validate() {
            state.error = Some(ExtractorError::Config(e));
            state.phase = Phase::Failed;
        }

        while !state.phase.is_terminal() {
            self.step(&mut state).await;
        }

        if let Some(e) = &state.error {
            error!(run_id = %run_id, error = %e, "Extraction failed");
        } else {
            info!(
                run_id = %run_id,
                chunks = state.chunks.len(),
                model_calls = state.model_calls,
                forced_finalizations = state.forced_finalizations,
                total_tokens = state.token_usage.total_tokens,
                "Extraction complete"
            );
        }

        ExtractionResult {
            metadata: ExtractionMetadata {
                run_id: run_id.to_string(),
                total_chunks: state.chunks.len(),
                final_guidance: state.guidance,
                model_name,
                model_calls: state.model_calls,
                forced_finalizations: state.forced_finalizations,
                token_usage: state.token_usage,
                processing_time_ms: start_time.elapsed().as_millis() as u64,
            },
            json_document: state.json_document,
            error: state.error,
        }
    }

    /// Advance the state machine by one phase.
    async fn step(&self, state: &mut RunState) {
        let delta = match state.phase {
            Phase::Chunking => {
                let delta = transitions::chunk_text(state, &self.chunker);
                if let Some(chunks) = &delta.chunks {
                    info!("Split text into {} chunks", chunks.len());
                }
                delta
            }
            Phase::PreparingChunk => {
                if state.error.is_none() && state.current_chunk_index < state.chunks.len() {
                    info!(
                        "Processing chunk {}/{}",
                        state.current_chunk_index + 1,
                        state.chunks.len()
                    );
                }
                transitions::prepare_chunk(state)
            }
            Phase::CallingModel => {
                let delta = transitions::begin_model_call(state);
                state.apply(delta);
                debug!(
                    chunk = state.current_chunk_index + 1,
                    iteration = state.iteration_count + 1,
                    messages = state.conversation.len(),
                    "Calling model"
                );
                let reply = self.call_llm(state.conversation.clone()).await;
                transitions::record_reply(state, reply)
            }
            Phase::ExecutingTools => transitions::execute_tools(state),
            Phase::FinalizingChunk => {
                if transitions::is_forced(state) {
                    warn!(
                        chunk = state.current_chunk_index + 1,
                        iterations = state.iteration_count,
                        "Iteration limit reached, moving on without guidance update"
                    );
                }
                transitions::finalize_chunk(state)
            }
            Phase::Done | Phase::Failed => return,
        };
        state.apply(delta);
    }

    /// Call the LLM provider
    async fn call_llm(&self, messages: Vec<ChatMessage>) -> Result<ChatReply, ExtractorError> {
        let llm = Arc::clone(&self.llm_provider);

        // Call in a blocking context since LlmProvider is not async
        let call = tokio::task::spawn_blocking(move || {
            llm.chat(&messages).map_err(|e| ExtractorError::Llm(e.to_string()))
        });

        match timeout(self.config.model_timeout(), call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => Err(ExtractorError::Llm(format!("Task join error: {}", e))),
            Err(_) => Err(ExtractorError::Timeout(self.config.model_timeout_secs)),
        }
    }
}
