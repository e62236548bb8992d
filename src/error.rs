// src/error.rs

use thiserror::Error;

use crate::store::doc_store::{NodeId, TreeId};
use crate::value::Value;

/// Errors surfaced by the index engine.
///
/// Every error aborts the enclosing host transaction; the engine never
/// retries internally. `MissingKey` is the only variant the
/// if-exists / or-insert wrappers suppress.
#[derive(Error, Debug)]
pub enum GroveError {
    #[error("namespace is already initialized")]
    AlreadyInitialized,

    #[error("namespace is not initialized")]
    NotInitialized,

    #[error("key already exists in tree: {0:?}")]
    DuplicateKey(Value),

    #[error("key missing from tree: {0:?}")]
    MissingKey(Value),

    #[error("maxNodeSize must be even and at least 4, got {0}")]
    InvalidFanout(usize),

    #[error("pagination limit must be positive, got {0}")]
    InvalidLimit(usize),

    #[error("cursor cannot be decoded: {0}")]
    InvalidCursor(String),

    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),

    #[error("node not found in store: {0}")]
    NodeMissing(NodeId),

    #[error("tree record not found in store: {0}")]
    TreeMissing(TreeId),

    #[error("storage operation failed: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, GroveError>;
