//! Differential gradient checking for a multi-graph reverse-mode autodiff engine.
//!
//! The crate ships a small CPU tensor type with per-graph gradient tracking
//! ([`Tensor`], [`GraphId`]), a reverse-mode engine ([`autograd::backward`]) and a
//! finite-difference estimator ([`autograd::numerical_gradient`]). On top of them,
//! [`check_backward`] and [`check_double_backward`] verify first- and second-order gradients
//! of arbitrary functions, the double-backprop contract and the absence of leaked graph
//! bookkeeping.

pub mod autograd;
pub mod buffer;
pub mod error;
pub mod ops;
pub mod tensor;
pub mod tensor_data;
pub mod types;
pub mod utils;

pub use autograd::grad_check::{check_backward, check_double_backward, GradCheckError};
pub use autograd::{DoubleBackprop, GraphId};
pub use error::TensorError;
pub use tensor::Tensor;
pub use types::DType;

// Re-export traits required by public functions/structs
pub use num_traits;
