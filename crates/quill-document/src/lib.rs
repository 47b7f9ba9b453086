//! Quill Document
//!
//! JSON Pointer addressing, bounded read-only queries, and an all-or-nothing
//! JSON Patch engine over a single in-memory `serde_json::Value`.
//!
//! # Overview
//!
//! The extraction agent never sees the full document it is building. It asks
//! for a slice at a time through the query functions and changes it through
//! patch lists:
//!
//! - [`inspect`]: keys of an object, length of an array, or a scalar preview
//! - [`read`]: the value at a path with size limits applied
//! - [`search`]: pointers to keys or values matching a query
//! - [`apply_patches`]: `add`/`remove`/`replace`/`move`/`copy`, atomically
//!
//! # Example
//!
//! ```
//! use quill_document::{apply_patches, inspect, NodeSummary};
//! use serde_json::json;
//!
//! let doc = json!({});
//! let patched = apply_patches(&doc, &[
//!     json!({"op": "add", "path": "/clients", "value": []}),
//!     json!({"op": "add", "path": "/clients/-", "value": {"name": "Client X"}}),
//! ])
//! .into_document()
//! .unwrap();
//!
//! match inspect(&patched, "/clients").body() {
//!     Some(NodeSummary::Array { length, .. }) => assert_eq!(*length, 1),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

#![warn(missing_docs)]

mod error;
pub mod patch;
pub mod pointer;
mod query;
mod search;

pub use error::{ApplyError, PatchError, PointerError};
pub use patch::{apply_patches, PatchOperation, PatchOutcome};
pub use query::{inspect, read, Lookup, NodeSummary, ReadBody, ReadLimits, INSPECT_PREVIEW_CHARS};
pub use search::{search, SearchMatch, SearchOptions, SearchOutcome, SearchType};
