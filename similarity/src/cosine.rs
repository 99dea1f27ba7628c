use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::SimilarityError;

/// Cosine similarity between the rows of `a` (m x n) and the columns of
/// `b` (n x p), giving an m x p block.
///
/// The numerator is `a · b`; the denominator is the square root of the outer
/// product of the squared row norms of `a` and squared column norms of `b`.
/// Taking a single root keeps identical 0/1 vectors at exactly 1.0, where
/// `sqrt(k) * sqrt(k)` may round above `k`. A zero-norm row or column
/// fails with [`SimilarityError::DegenerateVector`] instead of producing
/// NaN or infinity.
pub fn cosine_block(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<Array2<f32>, SimilarityError> {
    if a.ncols() != b.nrows() {
        return Err(SimilarityError::ShapeMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }

    let row_sq: Array1<f32> = a.map_axis(Axis(1), |r| r.dot(&r));
    if let Some(index) = row_sq.iter().position(|&x| x == 0.0) {
        return Err(SimilarityError::DegenerateVector { side: "row", index });
    }
    let col_sq: Array1<f32> = b.map_axis(Axis(0), |c| c.dot(&c));
    if let Some(index) = col_sq.iter().position(|&x| x == 0.0) {
        return Err(SimilarityError::DegenerateVector {
            side: "column",
            index,
        });
    }

    let mut out = a.dot(&b);
    for ((i, j), v) in out.indexed_iter_mut() {
        *v /= (row_sq[i] * col_sq[j]).sqrt();
    }
    Ok(out)
}

/// Cosine similarity between the rows of `a` (m x n) and the rows of `b`
/// (p x n).
pub fn cosine_pairwise(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Result<Array2<f32>, SimilarityError> {
    cosine_block(a, b.t())
}
