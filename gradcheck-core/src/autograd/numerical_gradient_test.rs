use super::*;
use crate::autograd::GraphId;
use crate::error::TensorError;
use crate::tensor::{full, Tensor};
use crate::types::DType;
use approx::assert_abs_diff_eq;

fn square(xs: &[Tensor]) -> Result<Vec<Tensor>, TensorError> {
    Ok(vec![xs[0].mul(&xs[0])?])
}

#[test]
fn test_square_gradient() {
    let x = Tensor::new_f64(vec![3.0, -1.0], vec![2]).unwrap();
    let gy = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    let eps = full(&[2], 1e-3, DType::F64).unwrap();
    let grads = numerical_gradient(square, &[x], &[gy], &[eps]).unwrap();
    assert_eq!(grads.len(), 1);
    let values = grads[0].get_f64_data().unwrap();
    assert_abs_diff_eq!(values[0], 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(values[1], -4.0, epsilon = 1e-9);
}

#[test]
fn test_two_inputs_two_outputs() {
    // y0 = a * b, y1 = a - b
    let func = |xs: &[Tensor]| -> Result<Vec<Tensor>, TensorError> {
        Ok(vec![xs[0].mul(&xs[1])?, xs[0].sub(&xs[1])?])
    };
    let a = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    let b = Tensor::new_f64(vec![5.0], vec![1]).unwrap();
    let gys = vec![
        Tensor::new_f64(vec![1.0], vec![1]).unwrap(),
        Tensor::new_f64(vec![10.0], vec![1]).unwrap(),
    ];
    let eps = vec![
        full(&[1], 1e-3, DType::F64).unwrap(),
        full(&[1], 1e-3, DType::F64).unwrap(),
    ];
    let grads = numerical_gradient(func, &[a, b], &gys, &eps).unwrap();
    assert_abs_diff_eq!(grads[0].item().unwrap(), 5.0 + 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(grads[1].item().unwrap(), 2.0 - 10.0, epsilon = 1e-9);
}

#[test]
fn test_result_matches_input_dtype() {
    let x = Tensor::new(vec![1.5], vec![1]).unwrap();
    let gy = Tensor::new(vec![1.0], vec![1]).unwrap();
    let eps = full(&[1], 1e-2, DType::F32).unwrap();
    let grads = numerical_gradient(square, &[x], &[gy], &[eps]).unwrap();
    assert_eq!(grads[0].dtype(), DType::F32);
    assert_abs_diff_eq!(grads[0].item().unwrap(), 3.0, epsilon = 1e-3);
}

#[test]
fn test_inputs_gain_no_graph_state() {
    let g = GraphId::default();
    let x = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    x.require_grad(&g);
    let gy = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let eps = full(&[1], 1e-3, DType::F64).unwrap();
    let seen_grad_required = std::cell::Cell::new(false);
    let func = |xs: &[Tensor]| -> Result<Vec<Tensor>, TensorError> {
        if xs[0].is_grad_required(&g) {
            seen_grad_required.set(true);
        }
        square(xs)
    };
    numerical_gradient(func, &[x.clone()], &[gy], &[eps]).unwrap();
    assert!(!seen_grad_required.get());
    assert!(x.grad(&g).is_none());
    assert!(x.is_leaf(&g));
}

#[test]
fn test_eps_count_mismatch() {
    let x = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    let gy = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let result = numerical_gradient(square, &[x], &[gy], &[]);
    assert!(matches!(result, Err(TensorError::CountMismatch { .. })));
}

#[test]
fn test_output_seed_count_mismatch() {
    let x = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    let eps = full(&[1], 1e-3, DType::F64).unwrap();
    let result = numerical_gradient(square, &[x], &[], &[eps]);
    assert!(matches!(result, Err(TensorError::CountMismatch { .. })));
}

#[test]
fn test_eps_shape_mismatch() {
    let x = Tensor::new_f64(vec![2.0, 3.0], vec![2]).unwrap();
    let gy = Tensor::new_f64(vec![1.0, 1.0], vec![2]).unwrap();
    let eps = full(&[1], 1e-3, DType::F64).unwrap();
    let result = numerical_gradient(square, &[x], &[gy], &[eps]);
    assert!(matches!(result, Err(TensorError::ShapeMismatch { .. })));
}

#[test]
fn test_eps_dtype_mismatch() {
    let x = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    let gy = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let eps = full(&[1], 1e-3, DType::F32).unwrap();
    let result = numerical_gradient(square, &[x], &[gy], &[eps]);
    assert!(matches!(
        result,
        Err(TensorError::DTypeMismatch {
            expected: DType::F64,
            actual: DType::F32,
            ..
        })
    ));
}

#[test]
fn test_zero_eps_is_rejected() {
    let x = Tensor::new_f64(vec![2.0, 3.0], vec![2]).unwrap();
    let gy = Tensor::new_f64(vec![1.0, 1.0], vec![2]).unwrap();
    let eps = Tensor::new_f64(vec![1e-3, 0.0], vec![2]).unwrap();
    let result = numerical_gradient(square, &[x], &[gy], &[eps]);
    assert!(matches!(result, Err(TensorError::UnsupportedOperation(_))));
}

#[test]
fn test_function_error_is_propagated() {
    let failing = |_: &[Tensor]| -> Result<Vec<Tensor>, TensorError> {
        Err(TensorError::UnsupportedOperation("boom".to_string()))
    };
    let x = Tensor::new_f64(vec![2.0], vec![1]).unwrap();
    let gy = Tensor::new_f64(vec![1.0], vec![1]).unwrap();
    let eps = full(&[1], 1e-3, DType::F64).unwrap();
    let result = numerical_gradient(failing, &[x], &[gy], &[eps]);
    assert_eq!(
        result.unwrap_err(),
        TensorError::UnsupportedOperation("boom".to_string())
    );
}
