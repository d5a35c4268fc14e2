use super::*;
use crate::autograd::{BackwardOp, GraphId};
use crate::error::TensorError;
use crate::ops::record_op;
use crate::tensor::Tensor;
use approx::assert_relative_eq;
use std::sync::Arc;

#[derive(Debug)]
struct WrongArityBackward;

impl BackwardOp for WrongArityBackward {
    fn backward(
        &self,
        _grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![])
    }
}

/// Returns a two-element gradient whatever the input's shape.
#[derive(Debug)]
struct WrongShapeBackward;

impl BackwardOp for WrongShapeBackward {
    fn backward(
        &self,
        _grad_output: &Tensor,
        _ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError> {
        Ok(vec![Some(Tensor::new_f64(vec![1.0, 1.0], vec![2])?)])
    }
}

fn leaf(value: f64, graph_id: &GraphId) -> Tensor {
    let t = Tensor::new_f64(vec![value], vec![1]).unwrap();
    t.require_grad(graph_id);
    t
}

#[test]
fn test_output_must_require_grad() {
    let g = GraphId::default();
    let y = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let result = backward(&[&y], &g, DoubleBackprop::Disable);
    assert!(matches!(result, Err(TensorError::GradNotRequired { .. })));
}

#[test]
fn test_explicit_seed_is_used_and_consumed() {
    let g = GraphId::default();
    let x = leaf(3.0, &g);
    let y = x.mul(&x).unwrap();
    y.set_grad(Tensor::new_f64(vec![0.5], vec![1]).unwrap(), &g)
        .unwrap();
    backward(&[&y], &g, DoubleBackprop::Disable).unwrap();
    assert_relative_eq!(x.grad(&g).unwrap().item().unwrap(), 3.0);
    assert!(y.grad(&g).is_none());
}

#[test]
fn test_leaf_gradients_accumulate_across_passes() {
    let g = GraphId::default();
    let x = leaf(2.0, &g);
    let y = x.mul_scalar(3.0).unwrap();
    backward(&[&y], &g, DoubleBackprop::Disable).unwrap();
    let z = x.mul_scalar(3.0).unwrap();
    backward(&[&z], &g, DoubleBackprop::Disable).unwrap();
    assert_relative_eq!(x.grad(&g).unwrap().item().unwrap(), 6.0);
}

#[test]
fn test_multiple_outputs_share_one_pass() {
    let g = GraphId::default();
    let x = leaf(2.0, &g);
    let y0 = x.mul(&x).unwrap();
    let y1 = x.mul_scalar(5.0).unwrap();
    backward(&[&y0, &y1], &g, DoubleBackprop::Disable).unwrap();
    assert_relative_eq!(x.grad(&g).unwrap().item().unwrap(), 4.0 + 5.0);
}

#[test]
fn test_other_graphs_are_untouched() {
    let g1 = GraphId::new("g1");
    let g2 = GraphId::new("g2");
    let x = leaf(2.0, &g1);
    x.require_grad(&g2);
    let y = x.mul(&x).unwrap();
    backward(&[&y], &g1, DoubleBackprop::Disable).unwrap();
    assert!(x.grad(&g1).is_some());
    assert!(x.grad(&g2).is_none());
}

#[test]
fn test_disable_stops_gradient_on_target_graph_only() {
    let g1 = GraphId::new("g1");
    let g2 = GraphId::new("g2");
    let x = leaf(2.0, &g1);
    x.require_grad(&g2);
    let y = x.mul(&x).unwrap();
    backward(&[&y], &g1, DoubleBackprop::Disable).unwrap();
    let gx = x.grad(&g1).unwrap();
    assert!(!gx.is_grad_required(&g1));
    assert!(gx.is_grad_required(&g2));
}

#[test]
fn test_enable_keeps_gradient_on_graph() {
    let g = GraphId::new("outer");
    let x = leaf(2.0, &g);
    let y = x.mul(&x).unwrap();
    backward(&[&y], &g, DoubleBackprop::Enable).unwrap();
    assert!(x.grad(&g).unwrap().is_grad_required(&g));
}

#[test]
fn test_dropped_leaf_is_skipped() {
    let g = GraphId::default();
    let y = {
        let x = leaf(2.0, &g);
        x.mul_scalar(2.0).unwrap()
    };
    backward(&[&y], &g, DoubleBackprop::Disable).unwrap();
}

#[test]
fn test_wrong_gradient_count_is_an_error() {
    let g = GraphId::default();
    let x = leaf(1.0, &g);
    let value = x.as_grad_stopped().mul_scalar(2.0).unwrap();
    let y = record_op("broken", &[&x], value, Arc::new(WrongArityBackward));
    let result = backward(&[&y], &g, DoubleBackprop::Disable);
    assert!(matches!(result, Err(TensorError::BackwardError(_))));
}

#[test]
fn test_repeated_output_is_seeded_once() {
    let g = GraphId::default();
    let x = leaf(3.0, &g);
    let y = x.mul(&x).unwrap();
    y.set_grad(Tensor::new_f64(vec![2.0], vec![1]).unwrap(), &g)
        .unwrap();
    backward(&[&y, &y], &g, DoubleBackprop::Disable).unwrap();
    assert_relative_eq!(x.grad(&g).unwrap().item().unwrap(), 12.0);
}

#[test]
fn test_wrong_gradient_shape_is_a_backward_error() {
    let g = GraphId::default();
    let x = leaf(1.0, &g);
    let value = x.as_grad_stopped().mul_scalar(2.0).unwrap();
    let bad = record_op("wrong_shape", &[&x], value, Arc::new(WrongShapeBackward));
    let y = bad.add(&x).unwrap();
    match backward(&[&y], &g, DoubleBackprop::Disable) {
        Err(TensorError::BackwardError(message)) => {
            assert!(message.contains("wrong_shape"));
            assert!(message.contains("[2]"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_wrong_gradient_dtype_is_a_backward_error() {
    let g = GraphId::default();
    let x = Tensor::new(vec![1.0, 1.0], vec![2]).unwrap();
    x.require_grad(&g);
    let value = x.as_grad_stopped().mul_scalar(2.0).unwrap();
    let y = record_op("wrong_dtype", &[&x], value, Arc::new(WrongShapeBackward));
    let result = backward(&[&y], &g, DoubleBackprop::Disable);
    assert!(matches!(result, Err(TensorError::BackwardError(_))));
}
