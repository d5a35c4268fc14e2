use super::*;
use crate::error::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_is_close_uses_expected_magnitude() {
    assert!(is_close(101.0, 100.0, 0.0, 0.01));
    assert!(!is_close(100.0, 101.0, 0.0, 0.001));
    assert!(is_close(0.0015, 0.001, 1e-3, 0.0));
    assert!(!is_close(f64::NAN, 1.0, 1.0, 1.0));
}

#[test]
fn test_all_close_across_dtypes() {
    let a = Tensor::new(vec![1.0, 2.0], vec![2]).unwrap();
    let b = Tensor::new_f64(vec![1.0005, 2.0], vec![2]).unwrap();
    assert!(a.all_close(&b, 1e-3, 0.0).unwrap());
    assert!(!a.all_close(&b, 1e-4, 0.0).unwrap());
}

#[test]
fn test_all_close_shape_mismatch() {
    let a = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    let b = Tensor::new_f64(vec![1.0, 2.0], vec![1, 2]).unwrap();
    assert!(matches!(
        all_close(&a, &b, 1.0, 1.0),
        Err(TensorError::ShapeMismatch { .. })
    ));
}
