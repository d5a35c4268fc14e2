use crate::autograd::{BackwardContext, BackwardOp};
use crate::error::TensorError;
use crate::ops::{apply_binary_op, needs_graph, record_op};
use crate::tensor::Tensor;
use std::sync::Arc;

// --- Backward Operation Structure ---

/// Backward of `a + b`: the upstream gradient passes through unchanged to both inputs.
#[derive(Debug)]
struct AddBackward;

impl BackwardOp for AddBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(grad_output.view()), Some(grad_output.view())])
    }
}

// --- Forward Operation ---

/// Element-wise addition of two tensors of identical shape and dtype.
///
/// # Errors
/// `ShapeMismatch` or `DTypeMismatch` if the operands disagree.
pub fn add_op(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    let output = apply_binary_op(a, b, |x, y| x + y, |x, y| x + y, "add")?;
    if !needs_graph(&[a, b]) {
        return Ok(output);
    }
    Ok(record_op("add", &[a, b], output, Arc::new(AddBackward)))
}

impl Tensor {
    /// `self + other`, see [`add_op`].
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        add_op(self, other)
    }
}

#[cfg(test)]
#[path = "add_test.rs"]
mod tests;
