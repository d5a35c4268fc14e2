use std::fmt::Debug;

use crate::error::TensorError;
use crate::types::DType;

/// Typed CPU storage backing one or more tensors.
///
/// A `Buffer` is always held behind an `Arc` by [`TensorData`](crate::tensor_data::TensorData),
/// so grad-stopped views and retained op inputs share the values without copying them.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// Buffer holding f32 data.
    F32(Vec<f32>),
    /// Buffer holding f64 data.
    F64(Vec<f64>),
}

impl Buffer {
    /// Builds a buffer of the given dtype from f64 values, narrowing when needed.
    pub fn from_f64_values(values: Vec<f64>, dtype: DType) -> Self {
        match dtype {
            DType::F32 => Buffer::F32(values.into_iter().map(|v| v as f32).collect()),
            DType::F64 => Buffer::F64(values),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::F32(data) => data.len(),
            Buffer::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempts to get the underlying f32 slice.
    ///
    /// Returns an error if the buffer is not of type F32.
    pub fn try_get_f32(&self) -> Result<&[f32], TensorError> {
        match self {
            Buffer::F32(data) => Ok(data),
            Buffer::F64(_) => Err(TensorError::DTypeMismatch {
                expected: DType::F32,
                actual: DType::F64,
                operation: "try_get_f32".to_string(),
            }),
        }
    }

    /// Attempts to get the underlying f64 slice.
    ///
    /// Returns an error if the buffer is not of type F64.
    pub fn try_get_f64(&self) -> Result<&[f64], TensorError> {
        match self {
            Buffer::F64(data) => Ok(data),
            Buffer::F32(_) => Err(TensorError::DTypeMismatch {
                expected: DType::F64,
                actual: DType::F32,
                operation: "try_get_f64".to_string(),
            }),
        }
    }

    /// Copies the values out, widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Buffer::F32(data) => data.iter().map(|&v| v as f64).collect(),
            Buffer::F64(data) => data.clone(),
        }
    }
}
