use crate::types::DType;
use thiserror::Error;

/// Error type for tensor construction, elementwise ops, the reverse-mode engine
/// and the numerical gradient estimator.
///
/// Gradient-check failures have their own type,
/// [`GradCheckError`](crate::autograd::grad_check::GradCheckError), which wraps this one.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TensorError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("DType mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    DTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Tensor does not require grad on graph '{graph_id}'")]
    GradNotRequired { graph_id: String },

    #[error("Shape mismatch while setting gradient: expected {expected:?}, got {actual:?}")]
    GradientShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Count mismatch in {operation}: {expected} {what} expected, got {actual}")]
    CountMismatch {
        operation: String,
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Backward error: {0}")]
    BackwardError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
