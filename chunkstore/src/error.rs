use thiserror::Error;

/// Errors that can occur in chunk store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("chunkstore: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunkstore: storage error: {0}")]
    Storage(String),

    #[error("chunkstore: serialization error: {0}")]
    Serialization(String),

    #[error("chunkstore: not found: {0}")]
    NotFound(String),

    #[error("chunkstore: shape mismatch: expected {expected} rows, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("chunkstore: store is closed")]
    Closed,
}

/// Result type for chunk store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn storage(e: impl std::fmt::Display) -> Self {
        StoreError::Storage(e.to_string())
    }

    pub(crate) fn serialization(e: impl std::fmt::Display) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
