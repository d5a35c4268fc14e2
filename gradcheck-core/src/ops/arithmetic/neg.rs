use crate::autograd::{BackwardContext, BackwardOp};
use crate::error::TensorError;
use crate::ops::{apply_scalar_op, needs_graph, record_op, ScalarOp};
use crate::tensor::Tensor;
use num_traits::Float;
use std::sync::Arc;

struct Negate;

impl ScalarOp for Negate {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn apply<T: Float>(&self, x: T, _scalar: T) -> T {
        -x
    }
}

#[derive(Debug)]
struct NegBackward;

impl BackwardOp for NegBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(neg_op(grad_output)?)])
    }
}

/// Element-wise negation.
pub fn neg_op(a: &Tensor) -> Result<Tensor, TensorError> {
    let output = apply_scalar_op(a, 0.0, Negate)?;
    if !needs_graph(&[a]) {
        return Ok(output);
    }
    Ok(record_op("neg", &[a], output, Arc::new(NegBackward)))
}

impl Tensor {
    pub fn neg(&self) -> Result<Tensor, TensorError> {
        neg_op(self)
    }
}

#[cfg(test)]
#[path = "neg_test.rs"]
mod tests;
