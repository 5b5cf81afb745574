//! Error taxonomy for the retrieval core
//!
//! Every fallible operation on the store returns [`KnowledgeError`]. The core
//! never retries and never logs-and-continues; callers at the outer boundary
//! decide how an error is presented.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, KnowledgeError>;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Model unavailable, or the input could not be embedded
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Remote service unreachable, or the local backend is in an invalid state
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Remote call exceeded its configured bound
    #[error("backend timed out during {operation} after {timeout:?}")]
    BackendTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Lookup of an id the store has never reported (delete returns `false` instead)
    #[error("knowledge entry not found: {0}")]
    NotFound(String),

    /// Vector length differs from the dimension established by the store
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Insert of an id this index has already issued
    #[error("duplicate knowledge id: {0}")]
    DuplicateId(String),

    /// Settings rejected at store construction
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KnowledgeError {
    /// True for failures caused by the backend rather than the caller's input.
    ///
    /// Lets a boundary layer tell "no matches" (an empty `Ok`) apart from an
    /// outage without matching on every variant.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_) | Self::BackendTimeout { .. }
        )
    }
}
