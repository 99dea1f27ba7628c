use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("similarity: shape mismatch: {left:?} x {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("similarity: zero-norm vector at {side} {index}")]
    DegenerateVector { side: &'static str, index: usize },

    #[error("similarity: weights sum to zero")]
    ZeroWeight,
}
