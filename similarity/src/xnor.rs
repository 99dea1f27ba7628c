use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::SimilarityError;

/// Weighted agreement between the Boolean rows of `a` (m x n) and the
/// Boolean columns of `b` (n x p).
///
/// Entry `(i, j)` is the weighted share of positions where row `i` and
/// column `j` hold the same value. Entries are read as 0/1. Without
/// `weights` every position counts once. Zero vectors are legal here.
pub fn xnor_score(
    a: ArrayView2<f32>,
    b: ArrayView2<f32>,
    weights: Option<ArrayView1<f32>>,
) -> Result<Array2<f32>, SimilarityError> {
    let n = a.ncols();
    if n != b.nrows() {
        return Err(SimilarityError::ShapeMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }
    let w: Array1<f32> = match weights {
        Some(w) if w.len() != n => {
            return Err(SimilarityError::ShapeMismatch {
                left: a.dim(),
                right: (w.len(), 1),
            });
        }
        Some(w) => w.to_owned(),
        None => Array1::ones(n),
    };
    let total = w.sum();
    if total == 0.0 {
        return Err(SimilarityError::ZeroWeight);
    }

    let a_set = &a * &w;
    let a_unset = &a.mapv(|x| 1.0 - x) * &w;
    let b_unset = b.mapv(|x| 1.0 - x);
    let agree = a_set.dot(&b) + a_unset.dot(&b_unset);
    Ok(agree / total)
}
