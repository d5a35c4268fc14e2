use crate::autograd::{BackwardContext, BackwardOp, RetainedInput};
use crate::error::TensorError;
use crate::ops::{apply_binary_op, needs_graph, record_op};
use crate::tensor::Tensor;
use std::sync::Arc;

// --- Backward Operation Structure ---

/// Backward operation context for multiplication.
#[derive(Debug)]
struct MulBackward {
    a: RetainedInput,
    b: RetainedInput,
}

// --- Backward Operation Implementation ---

impl BackwardOp for MulBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        let a = self.a.restore(ctx)?;
        let b = self.b.restore(ctx)?;

        // grad_a = grad_output * b
        let grad_a = mul_op(grad_output, &b)?;
        // grad_b = grad_output * a
        let grad_b = mul_op(grad_output, &a)?;

        Ok(vec![Some(grad_a), Some(grad_b)])
    }
}

// --- Forward Operation ---

/// Element-wise multiplication of two tensors of identical shape and dtype.
///
/// Both operands are retained for the backward pass. `a` and `b` may be the same tensor
/// (`x * x`), in which case the gradient reaching `x` is the sum of both contributions.
///
/// # Errors
/// `ShapeMismatch` or `DTypeMismatch` if the operands disagree.
pub fn mul_op(a: &Tensor, b: &Tensor) -> Result<Tensor, TensorError> {
    let output = apply_binary_op(a, b, |x, y| x * y, |x, y| x * y, "mul")?;
    if !needs_graph(&[a, b]) {
        return Ok(output);
    }
    let backward = MulBackward {
        a: RetainedInput::new(a),
        b: RetainedInput::new(b),
    };
    Ok(record_op("mul", &[a, b], output, Arc::new(backward)))
}

impl Tensor {
    /// `self * other`, see [`mul_op`].
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TensorError> {
        mul_op(self, other)
    }
}

#[cfg(test)]
#[path = "mul_test.rs"]
mod tests;
