//! Quill Domain Layer
//!
//! This crate holds the vocabulary shared by every other Quill crate. It has
//! no serialization or I/O dependencies and defines the value objects and trait
//! interfaces that the infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **ChatMessage**: One message exchanged with the language model during a turn
//! - **ChatReply**: The model's answer, with token usage when reported
//! - **RunId**: Identifier of a single extraction run
//! - **LlmProvider**: The boundary to the external language model
//! - **Chunker**: The boundary to text segmentation
//!
//! ## Architecture
//!
//! - Pure value types only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod run;
pub mod traits;

// Re-exports for convenience
pub use message::{ChatMessage, ChatReply, Role, Usage};
pub use run::RunId;
