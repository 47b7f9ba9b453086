//! Pure transition functions of the chunk state machine
//!
//! Each function reads the current [`RunState`] and returns the
//! [`StateDelta`] that moves it to the next phase. Nothing here performs I/O;
//! the model call itself is made by the orchestrator between
//! [`begin_model_call`] and [`record_reply`].

use crate::dispatcher::dispatch;
use crate::error::ExtractorError;
use crate::parser::parse_model_turn;
use crate::prompt::{build_observation_message, build_user_message, PromptBuilder};
use crate::state::{Phase, RunState, StateDelta};
use quill_domain::traits::Chunker;
use quill_domain::{ChatMessage, ChatReply, Role};
use serde_json::{Map, Value};

/// `Chunking`: split the text, or fail on empty input.
pub fn chunk_text<C: Chunker + ?Sized>(state: &RunState, chunker: &C) -> StateDelta {
    if state.text.trim().is_empty() {
        return StateDelta::fail(ExtractorError::NoText, Phase::Failed);
    }

    let chunks = chunker.chunk(&state.text);
    if chunks.is_empty() {
        return StateDelta::fail(ExtractorError::NoText, Phase::Failed);
    }

    StateDelta {
        phase: Some(Phase::PreparingChunk),
        chunks: Some(chunks),
        current_chunk_index: Some(0),
        json_document: Some(Value::Object(Map::new())),
        is_chunk_finalized: Some(false),
        iteration_count: Some(0),
        ..StateDelta::default()
    }
}

/// `PreparingChunk`: start the next chunk's conversation, or end the run.
pub fn prepare_chunk(state: &RunState) -> StateDelta {
    if state.error.is_some() {
        return StateDelta::to(Phase::Failed);
    }

    let index = state.current_chunk_index;
    let Some(chunk) = state.chunks.get(index) else {
        return StateDelta::to(Phase::Done);
    };

    let system_prompt = PromptBuilder::new()
        .with_target_schema(state.target_schema.as_ref())
        .with_guidance(state.guidance.as_ref())
        .with_document(&state.json_document)
        .build();
    let user_message = build_user_message(chunk, index, state.chunks.len());

    StateDelta {
        phase: Some(Phase::CallingModel),
        conversation: Some(vec![ChatMessage::system(system_prompt), ChatMessage::user(user_message)]),
        pending_results: Some(Vec::new()),
        is_chunk_finalized: Some(false),
        iteration_count: Some(0),
        ..StateDelta::default()
    }
}

/// `CallingModel`, before the call: show pending results to the model.
pub fn begin_model_call(state: &RunState) -> StateDelta {
    if state.pending_results.is_empty() {
        return StateDelta::default();
    }
    StateDelta {
        append_messages: vec![ChatMessage::user(build_observation_message(&state.pending_results))],
        pending_results: Some(Vec::new()),
        ..StateDelta::default()
    }
}

/// `CallingModel`, after the call: record the reply or the fatal failure.
pub fn record_reply(state: &RunState, reply: Result<ChatReply, ExtractorError>) -> StateDelta {
    let counted = StateDelta {
        iteration_count: Some(state.iteration_count + 1),
        model_calls: Some(state.model_calls + 1),
        ..StateDelta::default()
    };

    match reply {
        Ok(reply) => StateDelta {
            phase: Some(Phase::ExecutingTools),
            append_messages: vec![ChatMessage::assistant(reply.content)],
            token_usage: reply.usage.map(|usage| state.token_usage.plus(usage)),
            ..counted
        },
        Err(e) => StateDelta {
            phase: Some(Phase::FinalizingChunk),
            error: Some(e),
            ..counted
        },
    }
}

/// `ExecutingTools`: run the last reply's actions and decide whether the
/// chunk is done.
pub fn execute_tools(state: &RunState) -> StateDelta {
    let reply = state
        .conversation
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str());

    let turn = match reply {
        Some(reply) => parse_model_turn(reply),
        None => Err(ExtractorError::ModelOutput("No model response found".to_string())),
    };
    let turn = match turn {
        Ok(turn) => turn,
        Err(e) => return StateDelta::fail(e, Phase::FinalizingChunk),
    };

    let outcome = dispatch(&turn.actions, &state.json_document);
    let finalized = outcome.is_finalized();
    let done = finalized || state.iteration_count >= state.max_iterations;

    StateDelta {
        phase: Some(if done { Phase::FinalizingChunk } else { Phase::CallingModel }),
        json_document: outcome.document,
        is_chunk_finalized: Some(finalized),
        guidance: outcome.guidance,
        pending_results: Some(outcome.results),
        ..StateDelta::default()
    }
}

/// Whether the chunk is being left without a finalize action or error.
pub fn is_forced(state: &RunState) -> bool {
    !state.is_chunk_finalized && state.error.is_none()
}

/// `FinalizingChunk`: advance past the current chunk.
///
/// Runs after a finalize action, at the iteration cap, and after a fatal
/// error alike. A forced finalization leaves the baton untouched.
pub fn finalize_chunk(state: &RunState) -> StateDelta {
    StateDelta {
        phase: Some(Phase::PreparingChunk),
        current_chunk_index: Some(state.current_chunk_index + 1),
        is_chunk_finalized: Some(false),
        pending_results: Some(Vec::new()),
        forced_finalizations: is_forced(state).then_some(state.forced_finalizations + 1),
        ..StateDelta::default()
    }
}
