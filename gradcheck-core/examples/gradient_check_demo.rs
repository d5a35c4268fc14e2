//! Runs a passing and a failing gradient check and prints the diagnostics.
//!
//! `RUST_LOG=debug cargo run --example gradient_check_demo` shows the check phases.

use gradcheck_core::autograd::{BackwardContext, BackwardOp, RetainedInput};
use gradcheck_core::ops::record_op;
use gradcheck_core::tensor::full;
use gradcheck_core::{check_backward, check_double_backward, DType, GraphId, Tensor, TensorError};
use std::sync::Arc;

/// Stand-in for a buggy kernel: forward is `x * x`, backward claims `2x - 1`.
#[derive(Debug)]
struct BuggySquareBackward {
    x: RetainedInput,
}

impl BackwardOp for BuggySquareBackward {
    fn backward(
        &self,
        grad_output: &Tensor,
        ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        let x = self.x.restore(ctx)?;
        Ok(vec![Some(grad_output.mul(&x.mul_scalar(2.0)?.add_scalar(-1.0)?)?)])
    }
}

fn buggy_square(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    let stopped = xs[0].as_grad_stopped();
    let value = stopped.mul(&stopped)?;
    let backward = BuggySquareBackward {
        x: RetainedInput::new(&xs[0]),
    };
    Ok(vec![record_op("buggy_square", &[&xs[0]], value, Arc::new(backward))])
}

fn cube(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    Ok(vec![xs[0].mul(&xs[0])?.mul(&xs[0])?])
}

fn main() -> Result<(), TensorError> {
    env_logger::init();

    let graph_id = GraphId::default();
    let x = Tensor::new_f64(vec![3.0, -0.5], vec![2])?;
    x.require_grad(&graph_id);
    let gy = full(&[2], 1.0, DType::F64)?;
    let eps = full(&[2], 1e-3, DType::F64)?;

    println!("--- First order, correct backward ---");
    match check_backward(cube, &[x.clone()], &[gy.clone()], &[eps.clone()], 1e-4, 1e-4, None) {
        Ok(()) => println!("passed"),
        Err(e) => println!("failed: {}", e),
    }

    println!("--- First order, buggy backward ---");
    match check_backward(buggy_square, &[x.clone()], &[gy.clone()], &[eps.clone()], 1e-4, 1e-4, None) {
        Ok(()) => println!("passed"),
        Err(e) => println!("{:?} failure:\n{}", e.kind(), e),
    }

    println!("--- Second order ---");
    gy.require_grad(&graph_id);
    let ggx = full(&[2], 1.0, DType::F64)?;
    match check_double_backward(
        cube,
        &[x],
        &[gy],
        &[ggx],
        &[eps.clone(), eps],
        1e-4,
        1e-4,
        None,
    ) {
        Ok(()) => println!("passed"),
        Err(e) => println!("failed: {}", e),
    }
    Ok(())
}
