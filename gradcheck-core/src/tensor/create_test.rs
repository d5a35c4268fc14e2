use super::*;
use crate::autograd::GraphId;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_zeros_like() {
    let tensor = Tensor::new(vec![1.0f32, 2.0, 3.0], vec![1, 3]).unwrap();
    let zeros_t = zeros_like(&tensor).unwrap();
    assert_eq!(zeros_t.shape(), tensor.shape());
    assert_eq!(zeros_t.dtype(), DType::F32);
    assert_eq!(zeros_t.get_f32_data().unwrap(), vec![0.0; 3]);
}

#[test]
fn test_ones_like_keeps_dtype_and_drops_graph_state() {
    let tensor = Tensor::new_f64(vec![1.0, 2.0], vec![2]).unwrap();
    tensor.require_grad(&GraphId::default());
    let ones_t = ones_like(&tensor).unwrap();
    assert_eq!(ones_t.dtype(), DType::F64);
    assert_eq!(ones_t.get_f64_data().unwrap(), vec![1.0, 1.0]);
    assert!(!ones_t.is_grad_required(&GraphId::default()));
}

#[test]
fn test_full_f32() {
    let t = full(&[2, 2], 2.5, DType::F32).unwrap();
    assert_eq!(t.shape(), vec![2, 2]);
    assert_eq!(t.get_f32_data().unwrap(), vec![2.5f32; 4]);
}

#[test]
fn test_randn_with_seeded_rng_is_reproducible() {
    let a = randn_with_rng(&[3, 4], DType::F64, &mut StdRng::seed_from_u64(7)).unwrap();
    let b = randn_with_rng(&[3, 4], DType::F64, &mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a.shape(), vec![3, 4]);
    assert_eq!(a.to_f64_vec(), b.to_f64_vec());
}

#[test]
fn test_scalar_shape() {
    let t = zeros(&[], DType::F64).unwrap();
    assert_eq!(t.numel(), 1);
    assert_eq!(t.item().unwrap(), 0.0);
}
