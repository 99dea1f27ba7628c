//! Similarity scores between Boolean membership matrices, computed one
//! block at a time.

pub mod cosine;
pub mod error;
pub mod metric;
pub mod xnor;

pub use cosine::{cosine_block, cosine_pairwise};
pub use error::SimilarityError;
pub use metric::Metric;
pub use xnor::xnor_score;
