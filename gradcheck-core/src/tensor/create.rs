// src/tensor/create.rs

use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::types::DType;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Creates a new tensor filled with a specific value with the specified shape and dtype.
pub fn full(shape: &[usize], value: f64, dtype: DType) -> Result<Tensor, TensorError> {
    let numel = shape.iter().product();
    Tensor::from_f64_values(vec![value; numel], shape.to_vec(), dtype)
}

/// Creates a new tensor filled with zeros with the specified shape and dtype.
pub fn zeros(shape: &[usize], dtype: DType) -> Result<Tensor, TensorError> {
    full(shape, 0.0, dtype)
}

/// Creates a new tensor filled with ones with the specified shape and dtype.
pub fn ones(shape: &[usize], dtype: DType) -> Result<Tensor, TensorError> {
    full(shape, 1.0, dtype)
}

/// Creates a new tensor filled with zeros, having the same shape and dtype as the input tensor.
/// The result never requires grad.
pub fn zeros_like(tensor: &Tensor) -> Result<Tensor, TensorError> {
    zeros(&tensor.shape(), tensor.dtype())
}

/// Creates a new tensor filled with ones, having the same shape and dtype as the input tensor.
/// The result never requires grad.
pub fn ones_like(tensor: &Tensor) -> Result<Tensor, TensorError> {
    ones(&tensor.shape(), tensor.dtype())
}

/// Samples a standard-normal tensor from the given RNG (use a seeded one for
/// reproducible tests).
pub fn randn_with_rng<R: Rng + ?Sized>(
    shape: &[usize],
    dtype: DType,
    rng: &mut R,
) -> Result<Tensor, TensorError> {
    let numel = shape.iter().product();
    let values: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(rng)).collect();
    Tensor::from_f64_values(values, shape.to_vec(), dtype)
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
