use crate::autograd::{BackwardContext, BackwardOp};
use crate::error::TensorError;
use crate::ops::arithmetic::neg::neg_op;
use crate::ops::{apply_binary_op, needs_graph, record_op};
use crate::tensor::Tensor;
use std::sync::Arc;

// --- Backward Operation Structure ---

#[derive(Debug)]
struct SubBackward;

impl BackwardOp for SubBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        // d(a - b)/da = 1, d(a - b)/db = -1
        Ok(vec![Some(grad_output.view()), Some(neg_op(grad_output)?)])
    }
}

// --- Forward Operation ---

/// Element-wise subtraction `a - b`.
pub fn sub_op(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    let output = apply_binary_op(a, b, |x, y| x - y, |x, y| x - y, "sub")?;
    if !needs_graph(&[a, b]) {
        return Ok(output);
    }
    Ok(record_op("sub", &[a, b], output, Arc::new(SubBackward)))
}

impl Tensor {
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        sub_op(self, other)
    }
}

#[cfg(test)]
#[path = "sub_test.rs"]
mod tests;
