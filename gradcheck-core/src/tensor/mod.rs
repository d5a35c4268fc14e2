// src/tensor/mod.rs

use crate::autograd::leak_tracker;
use crate::buffer::Buffer;
use crate::error::TensorError;
use crate::tensor_data::TensorData;
use crate::types::DType;
use std::sync::{Arc, RwLock};

mod autograd_methods;
pub mod create;
pub(crate) mod traits;

pub use create::{full, ones, ones_like, randn_with_rng, zeros, zeros_like};

/// Represents a multi-dimensional array (tensor).
///
/// `Tensor` uses `Arc<RwLock<TensorData>>` internally to allow for:
/// 1.  **Shared Ownership:** cloning a `Tensor` is cheap and yields another handle
///     to the *same* storage object (see [`Tensor::is_same`]).
/// 2.  **Interior Mutability:** per-graph autograd state (`requires_grad`, gradients)
///     can be modified through a shared reference.
///
/// Every body created while a [`LeakDetectionScope`](crate::autograd::leak_tracker::LeakDetectionScope)
/// is active on the current thread is recorded by that scope's tracker.
pub struct Tensor {
    pub(crate) data: Arc<RwLock<TensorData>>,
}

impl Tensor {
    /// Creates a new F32 Tensor with the given data and shape.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TensorError> {
        Ok(Self::from_data(TensorData::new(data_vec, shape)?))
    }

    /// Creates a new F64 Tensor with the given data and shape.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, TensorError> {
        Ok(Self::from_data(TensorData::new_f64(data_vec, shape)?))
    }

    /// Creates a tensor of the given dtype from f64 values (narrowed for F32).
    pub fn from_f64_values(
        values: Vec<f64>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Result<Self, TensorError> {
        let buffer = Arc::new(Buffer::from_f64_values(values, dtype));
        Ok(Self::from_data(TensorData::from_buffer(buffer, shape)?))
    }

    /// Wraps a freshly built body. All tensor construction funnels through here
    /// so the leak tracker sees every body.
    pub(crate) fn from_data(tensor_data: TensorData) -> Self {
        let data = Arc::new(RwLock::new(tensor_data));
        leak_tracker::register_body(&data);
        Tensor { data }
    }

    /// Returns the data type (`DType`) of the tensor elements.
    pub fn dtype(&self) -> DType {
        self.read_data().dtype
    }

    /// Returns a clone of the tensor's shape (`Vec<usize>`).
    pub fn shape(&self) -> Vec<usize> {
        self.read_data().shape.clone()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.read_data().numel()
    }

    /// Returns `true` if both handles refer to the same storage object (body).
    ///
    /// Two tensors holding equal values but created separately are *not* the same.
    pub fn is_same(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Acquires a read lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn read_data(&self) -> std::sync::RwLockReadGuard<'_, TensorData> {
        self.data.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the tensor's data.
    ///
    /// Panics if the RwLock is poisoned.
    pub fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, TensorData> {
        self.data.write().expect("RwLock poisoned")
    }

    /// Shared handle to the value buffer.
    pub(crate) fn buffer(&self) -> Arc<Buffer> {
        Arc::clone(&self.read_data().buffer)
    }

    /// Attempts to get the tensor data as a `Vec<f32>`.
    /// Returns an error if the tensor is not F32.
    pub fn get_f32_data(&self) -> Result<Vec<f32>, TensorError> {
        Ok(self.read_data().buffer.try_get_f32()?.to_vec())
    }

    /// Attempts to get the tensor data as a `Vec<f64>`.
    /// Returns an error if the tensor is not F64.
    pub fn get_f64_data(&self) -> Result<Vec<f64>, TensorError> {
        Ok(self.read_data().buffer.try_get_f64()?.to_vec())
    }

    /// Copies the values out as f64 regardless of dtype.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.read_data().buffer.to_f64_vec()
    }

    /// Returns the single value of a one-element tensor.
    pub fn item(&self) -> Result<f64, TensorError> {
        let values = self.to_f64_vec();
        if values.len() != 1 {
            return Err(TensorError::ShapeMismatch {
                expected: vec![1],
                actual: self.shape(),
                operation: "item".to_string(),
            });
        }
        Ok(values[0])
    }
}
