use crate::error::TensorError;
use crate::tensor::Tensor;

/// Element closeness: `|actual - expected| <= atol + rtol * |expected|`.
///
/// Not symmetric: the relative term scales with `expected` only. NaN is never close.
pub fn is_close(actual: f64, expected: f64, atol: f64, rtol: f64) -> bool {
    (actual - expected).abs() <= atol + rtol * expected.abs()
}

/// Returns `true` if `a` and `b` have the same shape and every element of `a` is close to
/// the matching element of `b` (see [`is_close`]). Dtypes may differ.
///
/// # Errors
/// `ShapeMismatch` if the shapes differ.
pub fn all_close(a: &Tensor, b: &Tensor, atol: f64, rtol: f64) -> Result<bool, TensorError> {
    let (a_shape, b_shape) = (a.shape(), b.shape());
    if a_shape != b_shape {
        return Err(TensorError::ShapeMismatch {
            expected: a_shape,
            actual: b_shape,
            operation: "all_close".to_string(),
        });
    }
    Ok(a
        .to_f64_vec()
        .into_iter()
        .zip(b.to_f64_vec())
        .all(|(x, y)| is_close(x, y, atol, rtol)))
}

impl Tensor {
    pub fn all_close(&self, other: &Tensor, atol: f64, rtol: f64) -> Result<bool, TensorError> {
        all_close(self, other, atol, rtol)
    }
}

#[cfg(test)]
#[path = "comparison_test.rs"]
mod tests;
