use thiserror::Error;
use tracegroup_chunkstore::StoreError;
use tracegroup_similarity::SimilarityError;
use tracegroup_vocab::VocabError;

/// Errors returned by clustering runs.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster: invalid config: {0}")]
    InvalidConfig(String),

    #[error("cluster: shape mismatch: expected {expected} {what}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cluster: trace {id:?} matches no vocabulary frame")]
    DegenerateVector { id: String },

    #[error("cluster: empty trace for {id:?}")]
    EmptyTrace { id: String },

    #[error("cluster: no documents to cluster")]
    EmptyBatch,

    #[error("cluster: internal consistency violated: {0}")]
    InternalConsistency(String),

    #[error("cluster: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Vocab(#[from] VocabError),

    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Result type for clustering operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
