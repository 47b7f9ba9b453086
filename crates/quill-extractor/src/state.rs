//! Run state threaded through the chunk state machine

use crate::dispatcher::ActionResult;
use crate::error::ExtractorError;
use crate::guidance::Guidance;
use crate::types::TokenUsage;
use quill_domain::ChatMessage;
use serde_json::{Map, Value};

/// Where the run is in the chunk loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Splitting the text
    Chunking,
    /// Selecting the next chunk or ending the run
    PreparingChunk,
    /// Waiting for the model
    CallingModel,
    /// Running the actions of the last reply
    ExecutingTools,
    /// Advancing past the current chunk
    FinalizingChunk,
    /// Every chunk processed
    Done,
    /// Stopped by a fatal error
    Failed,
}

impl Phase {
    /// Whether the run has stopped
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// Complete state of one extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    /// Current phase
    pub phase: Phase,
    /// Input text
    pub text: String,
    /// Advisory schema
    pub target_schema: Option<Value>,
    /// Ordered chunks, fixed after chunking
    pub chunks: Vec<String>,
    /// Index of the chunk being processed
    pub current_chunk_index: usize,
    /// Output document
    pub json_document: Value,
    /// Baton from the last finalized chunk
    pub guidance: Option<Guidance>,
    /// Messages exchanged for the current chunk
    pub conversation: Vec<ChatMessage>,
    /// Results of the last executed turn, not yet shown to the model
    pub pending_results: Vec<ActionResult>,
    /// Model calls for the current chunk
    pub iteration_count: usize,
    /// Model calls allowed per chunk
    pub max_iterations: usize,
    /// Set by a valid finalize action
    pub is_chunk_finalized: bool,
    /// Fatal error
    pub error: Option<ExtractorError>,
    /// Model calls across the run
    pub model_calls: usize,
    /// Chunks ended by the iteration cap
    pub forced_finalizations: usize,
    /// Tokens reported across the run
    pub token_usage: TokenUsage,
}

impl RunState {
    /// Fresh state for `text`
    pub fn new(text: impl Into<String>, target_schema: Option<Value>, max_iterations: usize) -> Self {
        Self {
            phase: Phase::Chunking,
            text: text.into(),
            target_schema,
            chunks: Vec::new(),
            current_chunk_index: 0,
            json_document: Value::Object(Map::new()),
            guidance: None,
            conversation: Vec::new(),
            pending_results: Vec::new(),
            iteration_count: 0,
            max_iterations,
            is_chunk_finalized: false,
            error: None,
            model_calls: 0,
            forced_finalizations: 0,
            token_usage: TokenUsage::default(),
        }
    }

    /// Apply a delta produced by a transition.
    pub fn apply(&mut self, delta: StateDelta) {
        if let Some(phase) = delta.phase {
            self.phase = phase;
        }
        if let Some(chunks) = delta.chunks {
            self.chunks = chunks;
        }
        if let Some(index) = delta.current_chunk_index {
            self.current_chunk_index = index;
        }
        if let Some(document) = delta.json_document {
            self.json_document = document;
        }
        if let Some(guidance) = delta.guidance {
            self.guidance = Some(guidance);
        }
        if let Some(conversation) = delta.conversation {
            self.conversation = conversation;
        }
        self.conversation.extend(delta.append_messages);
        if let Some(results) = delta.pending_results {
            self.pending_results = results;
        }
        if let Some(count) = delta.iteration_count {
            self.iteration_count = count;
        }
        if let Some(finalized) = delta.is_chunk_finalized {
            self.is_chunk_finalized = finalized;
        }
        // the first fatal error wins
        if self.error.is_none() {
            self.error = delta.error;
        }
        if let Some(calls) = delta.model_calls {
            self.model_calls = calls;
        }
        if let Some(forced) = delta.forced_finalizations {
            self.forced_finalizations = forced;
        }
        if let Some(usage) = delta.token_usage {
            self.token_usage = usage;
        }
    }
}

/// Partial update returned by a transition
///
/// `None` leaves a field unchanged. `conversation` replaces the history,
/// `append_messages` extends it after any replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    /// Next phase
    pub phase: Option<Phase>,
    /// New chunk list
    pub chunks: Option<Vec<String>>,
    /// New chunk index
    pub current_chunk_index: Option<usize>,
    /// New document
    pub json_document: Option<Value>,
    /// New baton
    pub guidance: Option<Guidance>,
    /// Replacement history
    pub conversation: Option<Vec<ChatMessage>>,
    /// Messages to append
    pub append_messages: Vec<ChatMessage>,
    /// New pending results
    pub pending_results: Option<Vec<ActionResult>>,
    /// New per-chunk call count
    pub iteration_count: Option<usize>,
    /// New finalized flag
    pub is_chunk_finalized: Option<bool>,
    /// Fatal error to record
    pub error: Option<ExtractorError>,
    /// New run-wide call count
    pub model_calls: Option<usize>,
    /// New forced finalization count
    pub forced_finalizations: Option<usize>,
    /// New token totals
    pub token_usage: Option<TokenUsage>,
}

impl StateDelta {
    /// Delta that only moves to `phase`
    pub fn to(phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            ..Self::default()
        }
    }

    /// Delta that records a fatal error and moves to `phase`
    pub fn fail(error: ExtractorError, phase: Phase) -> Self {
        Self {
            phase: Some(phase),
            error: Some(error),
            ..Self::default()
        }
    }
}
