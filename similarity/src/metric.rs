use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::cosine::cosine_block;
use crate::error::SimilarityError;
use crate::xnor::xnor_score;

/// Similarity measure used for document-to-document blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    Xnor,
}

impl Metric {
    /// Score the rows of `a` (m x n) against the columns of `b` (n x p).
    pub fn block(&self, a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<Array2<f32>, SimilarityError> {
        match self {
            Metric::Cosine => cosine_block(a, b),
            Metric::Xnor => xnor_score(a, b, None),
        }
    }

    /// Score the rows of `a` against the rows of `b`.
    pub fn pairwise(&self, a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<Array2<f32>, SimilarityError> {
        self.block(a, b.t())
    }

    /// True if zero-membership documents cannot be scored.
    pub fn rejects_zero_vectors(&self) -> bool {
        matches!(self, Metric::Cosine)
    }
}
