//! Quill Extractor
//!
//! Turns long unstructured text into a JSON document by driving a language
//! model through an observe/decide/act loop, one chunk at a time.
//!
//! # Overview
//!
//! The model never rewrites the document wholesale. Each turn it asks for
//! actions (`inspect_keys`, `read_value`, `search_pointer`, `apply_patches`)
//! and sees their results on the next turn. A chunk ends when the model
//! sends `update_guidance` as the only action of a turn, leaving a baton for
//! the next chunk, or when the per-chunk iteration cap is hit.
//!
//! # Architecture
//!
//! ```text
//! Chunking → PreparingChunk → CallingModel ⇄ ExecutingTools → FinalizingChunk → PreparingChunk … → Done
//! ```
//!
//! Transitions are pure functions over [`RunState`]; the [`Extractor`] loop
//! applies them and owns the only asynchronous step, the model call.
//!
//! # Example Usage
//!
//! ```no_run
//! use quill_extractor::{Extractor, ExtractorConfig, ExtractionRequest};
//! use quill_llm::MockProvider;
//!
//! # async fn example() {
//! let llm = MockProvider::scripted([
//!     r#"{"think": "add the client", "actions": [{"action": "apply_patches", "input": {"patches": [{"op": "add", "path": "/client", "value": "Acme"}]}}]}"#,
//!     r#"{"think": "done", "actions": [{"action": "update_guidance", "input": {"current_context": "client"}}]}"#,
//! ]);
//! let extractor = Extractor::new(llm, ExtractorConfig::default());
//!
//! let result = extractor.extract(ExtractionRequest::new("Acme signed the contract.")).await;
//!
//! println!("{}", result.json_document);
//! println!("Chunks: {}", result.metadata.total_chunks);
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
pub mod dispatcher;
mod error;
mod guidance;
mod orchestrator;
pub mod parser;
pub mod prompt;
mod state;
pub mod transitions;
mod types;


pub use chunking::TextChunker;
pub use config::{ChunkStrategy, ExtractorConfig};
pub use dispatcher::{dispatch, Action, ActionError, ActionResult, TurnOutcome};
pub use error::ExtractorError;
pub use guidance::{Finalized, Guidance};
pub use orchestrator::Extractor;
pub use parser::{parse_model_turn, ModelTurn, RawAction};
pub use state::{Phase, RunState, StateDelta};
pub use types::{ExtractionMetadata, ExtractionRequest, ExtractionResult, TokenUsage};
