//! Error types for pointer resolution and patching

use thiserror::Error;

/// Errors raised while parsing or resolving a JSON Pointer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// Pointer text is not a valid RFC 6901 pointer
    #[error("Invalid JSON Pointer (must start with \"/\"): {0}")]
    InvalidPointer(String),

    /// Pointer is well formed but does not address an existing node
    #[error("Unresolvable JSON Pointer {pointer:?}: {reason}")]
    Unresolvable {
        /// Pointer prefix that failed to resolve
        pointer: String,
        /// Why navigation stopped
        reason: String,
    },
}

/// Why a single patch operation could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Target or source path does not resolve
    #[error("{0}")]
    Pointer(#[from] PointerError),

    /// Member or element to remove/replace does not exist
    #[error("can't {op} non-existent location {path:?}")]
    Missing {
        /// Operation name
        op: &'static str,
        /// Target path
        path: String,
    },

    /// Array index token is not a usable index
    #[error("invalid array index {token:?} at {path:?}")]
    InvalidIndex {
        /// Offending token
        token: String,
        /// Target path
        path: String,
    },

    /// Parent of the target is a scalar
    #[error("parent of {0:?} is not an object or array")]
    NotAContainer(String),

    /// Removing the whole document is not allowed
    #[error("can't remove the document root")]
    RemoveRoot,

    /// `move` into a descendant of its own source
    #[error("can't move {from:?} into its own child {path:?}")]
    MoveIntoChild {
        /// Source path
        from: String,
        /// Destination path
        path: String,
    },
}

/// Errors reported by [`crate::apply_patches`]
///
/// Every variant carries the index of the offending operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// `test` is recognised but deliberately unsupported
    #[error("Operation 'test' is not supported. Use inspect_keys/read_value/search_pointer instead.")]
    UnsupportedTest {
        /// Operation index
        index: usize,
    },

    /// Missing or unknown `op`
    #[error("Invalid operation '{op}' at index {index}. Supported: add, remove, replace, move, copy")]
    InvalidOperation {
        /// Operation index
        index: usize,
        /// Operation name as supplied, `null` when absent
        op: String,
    },

    /// Recognised `op` with missing or mistyped fields
    #[error("Malformed operation at index {index}: {reason}")]
    MalformedOperation {
        /// Operation index
        index: usize,
        /// Deserialization failure
        reason: String,
    },

    /// Operation was valid but could not be applied to the document
    #[error("Patch conflict at index {index}: {source}")]
    Conflict {
        /// Operation index
        index: usize,
        /// Underlying cause
        source: ApplyError,
    },
}

impl PatchError {
    /// Index of the operation that caused the failure
    pub fn index(&self) -> usize {
        match self {
            PatchError::UnsupportedTest { index }
            | PatchError::InvalidOperation { index, .. }
            | PatchError::MalformedOperation { index, .. }
            | PatchError::Conflict { index, .. } => *index,
        }
    }
}
