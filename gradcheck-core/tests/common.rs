use gradcheck_core::autograd::{BackwardContext, BackwardOp, RetainedInput};
use gradcheck_core::ops::record_op;
use gradcheck_core::tensor::full;
use gradcheck_core::{DType, GraphId, Tensor, TensorError};
use std::sync::Arc;

// Each integration test binary compiles this module separately and uses a different
// subset of it.

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn scalar(value: f64) -> Tensor {
    Tensor::new_f64(vec![value], vec![1]).expect("Test tensor creation failed")
}

/// A one-element F64 tensor requiring grad on every graph in `graphs`.
#[allow(dead_code)]
pub fn scalar_on(value: f64, graphs: &[&GraphId]) -> Tensor {
    let t = scalar(value);
    for graph_id in graphs {
        t.require_grad(graph_id);
    }
    t
}

#[allow(dead_code)]
pub fn eps_like(tensors: &[Tensor], value: f64) -> Vec<Tensor> {
    tensors
        .iter()
        .map(|t| full(&t.shape(), value, t.dtype()).expect("eps creation failed"))
        .collect()
}

#[allow(dead_code)]
pub fn ones_like_all(tensors: &[Tensor]) -> Vec<Tensor> {
    tensors
        .iter()
        .map(|t| full(&t.shape(), 1.0, DType::F64).expect("seed creation failed"))
        .collect()
}

#[allow(dead_code)]
pub fn square(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    Ok(vec![xs[0].mul(&xs[0])?])
}

#[allow(dead_code)]
pub fn cube(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    Ok(vec![xs[0].mul(&xs[0])?.mul(&xs[0])?])
}

/// Backward of `x * x` that claims the derivative is `2x - 1`.
///
/// Built from differentiable ops so it also behaves under double backprop.
#[allow(dead_code)]
#[derive(Debug)]
struct OffByOneSquareBackward {
    x: RetainedInput,
}

impl BackwardOp for OffByOneSquareBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        let x = self.x.restore(ctx)?;
        let slope = x.mul_scalar(2.0)?.add_scalar(-1.0)?;
        Ok(vec![Some(grad_output.mul(&slope)?)])
    }
}

/// `x * x` with a wrong backward.
#[allow(dead_code)]
pub fn off_by_one_square(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    let stopped = xs[0].as_grad_stopped();
    let value = stopped.mul(&stopped)?;
    let backward = OffByOneSquareBackward {
        x: RetainedInput::new(&xs[0]),
    };
    Ok(vec![record_op(
        "off_by_one_square",
        &[&xs[0]],
        value,
        Arc::new(backward),
    )])
}

/// Returns a two-element gradient whatever the input's shape.
#[allow(dead_code)]
#[derive(Debug)]
struct MisshapenBackward;

impl BackwardOp for MisshapenBackward {
    fn backward(
        &self,
        _grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(Tensor::new_f64(vec![2.0, 2.0], vec![2])?)])
    }
}

/// `2x + x` where the backward of `2x` is misshapen.
#[allow(dead_code)]
pub fn misshapen_triple(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    let value = xs[0].as_grad_stopped().mul_scalar(2.0)?;
    let doubled = record_op("misshapen_double", &[&xs[0]], value, Arc::new(MisshapenBackward));
    Ok(vec![doubled.add(&xs[0])?])
}
