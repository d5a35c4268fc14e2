//! Operations between a tensor and a host scalar.
//!
//! The scalar is given as `f64` and cast to the tensor's dtype; it never participates in a
//! graph.

use crate::autograd::{BackwardContext, BackwardOp};
use crate::error::TensorError;
use crate::ops::{apply_scalar_op, needs_graph, record_op, ScalarOp};
use crate::tensor::Tensor;
use num_traits::Float;
use std::sync::Arc;

struct Scale;

impl ScalarOp for Scale {
    fn name(&self) -> &'static str {
        "mul_scalar"
    }

    fn apply<T: Float>(&self, x: T, scalar: T) -> T {
        x * scalar
    }
}

struct Shift;

impl ScalarOp for Shift {
    fn name(&self) -> &'static str {
        "add_scalar"
    }

    fn apply<T: Float>(&self, x: T, scalar: T) -> T {
        x + scalar
    }
}

#[derive(Debug)]
struct MulScalarBackward {
    scalar: f64,
}

impl BackwardOp for MulScalarBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(mul_scalar_op(grad_output, self.scalar)?)])
    }
}

#[derive(Debug)]
struct AddScalarBackward;

impl BackwardOp for AddScalarBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(grad_output.view())])
    }
}

/// `a * scalar`, element-wise.
///
/// # Errors
/// `UnsupportedOperation` if `scalar` cannot be represented in the tensor's dtype.
pub fn mul_scalar_op(a: &Tensor, scalar: f64) -> Result<Tensor, TensorError> {
    let output = apply_scalar_op(a, scalar, Scale)?;
    if !needs_graph(&[a]) {
        return Ok(output);
    }
    Ok(record_op(
        "mul_scalar",
        &[a],
        output,
        Arc::new(MulScalarBackward { scalar }),
    ))
}

/// `a + scalar`, element-wise.
pub fn add_scalar_op(a: &Tensor, scalar: f64) -> Result<Tensor, TensorError> {
    let output = apply_scalar_op(a, scalar, Shift)?;
    if !needs_graph(&[a]) {
        return Ok(output);
    }
    Ok(record_op("add_scalar", &[a], output, Arc::new(AddScalarBackward)))
}

impl Tensor {
    pub fn mul_scalar(&self, scalar: f64) -> Result<Tensor, TensorError> {
        mul_scalar_op(self, scalar)
    }

    pub fn add_scalar(&self, scalar: f64) -> Result<Tensor, TensorError> {
        add_scalar_op(self, scalar)
    }
}

#[cfg(test)]
#[path = "scalar_test.rs"]
mod tests;
