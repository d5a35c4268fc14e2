use crate::buffer::Buffer;
use crate::error::TensorError;
use crate::tensor::traits::{format_shape, write_array};
use crate::tensor::Tensor;
use crate::types::DType;
use std::fmt;
use thiserror::Error;

/// Broad classification of a [`GradCheckError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckErrorKind {
    /// The caller broke a precondition of the harness (non-leaf input, aliasing, count
    /// mismatches, untracked tensors where tracking is required).
    HarnessContract,
    /// The property under test does not hold.
    CheckFailure,
}

/// Which tensor a [`GradCheckError::NotDifferentiable`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorRole {
    Input,
    OutputGradient,
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorRole::Input => write!(f, "Input array"),
            TensorRole::OutputGradient => write!(f, "Output gradient array"),
        }
    }
}

/// Error type for gradient checking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check requires at least one input array")]
    EmptyInputs,

    #[error("Input {index} is not a leaf node of graph '{graph_id}': all inputs must be leaf nodes of the computational graph")]
    InputNotLeaf { index: usize, graph_id: String },

    #[error("Input {input} and output {output} of the forward function are identical")]
    IdenticalInputOutput { input: usize, output: usize },

    #[error("Size of function outputs ({outputs}) and size of grad outputs ({grad_outputs}) must be the same")]
    GradOutputCountMismatch { outputs: usize, grad_outputs: usize },

    #[error("Number of inputs ({inputs}) and grad_grad_inputs ({grad_grad_inputs}) do not match")]
    GradGradInputCountMismatch {
        inputs: usize,
        grad_grad_inputs: usize,
    },

    #[error("{role} {index} / {total} is not differentiable w.r.t. the graph '{graph_id}'")]
    NotDifferentiable {
        role: TensorRole,
        index: usize,
        total: usize,
        graph_id: String,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("Number of input gradients ({actual}) does not match the number of input arrays ({expected})")]
    InputGradientCountMismatch { expected: usize, actual: usize },

    #[error("Shape of input gradient {index} of {total} {} does not match the corresponding input shape {}", format_shape(.actual), format_shape(.expected))]
    GradientShapeMismatch {
        index: usize,
        total: usize,
        actual: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("Dtype of input gradient {index} of {total} {actual} does not match the corresponding input dtype {expected}")]
    GradientDTypeMismatch {
        index: usize,
        total: usize,
        actual: DType,
        expected: DType,
    },

    #[error("{}", .violations.join("\n"))]
    DoubleBackpropViolation { violations: Vec<String> },

    #[error("{0}")]
    NumericalMismatch(MismatchReport),

    #[error("Number of first-order input gradients ({actual}) does not match the number of input arrays ({expected})")]
    FirstOrderGradientCountMismatch { expected: usize, actual: usize },

    #[error("First-order input gradient {index} / {total} does not exist. Maybe you need additional nonlinearity in the target function")]
    FirstOrderGradientMissing { index: usize, total: usize },

    #[error("First-order input gradient {index} / {total} is not differentiable w.r.t. the graph '{graph_id}'. Maybe you need additional nonlinearity in the target function")]
    FirstOrderGradientNotDifferentiable {
        index: usize,
        total: usize,
        graph_id: String,
    },

    #[error("{}", second_order_missing_message(.missing, .num_inputs, .num_outputs, .graph_id))]
    SecondOrderGradientMissing {
        missing: Vec<usize>,
        num_inputs: usize,
        num_outputs: usize,
        graph_id: String,
    },

    #[error("{0}")]
    Leak(String),
}

impl GradCheckError {
    pub fn kind(&self) -> CheckErrorKind {
        match self {
            GradCheckError::EmptyInputs
            | GradCheckError::InputNotLeaf { .. }
            | GradCheckError::IdenticalInputOutput { .. }
            | GradCheckError::GradOutputCountMismatch { .. }
            | GradCheckError::GradGradInputCountMismatch { .. }
            | GradCheckError::NotDifferentiable { .. } => CheckErrorKind::HarnessContract,
            // A backward op misbehaving is the engine failing the check, anything else raised
            // by tensor code means the harness was misused.
            GradCheckError::Tensor(TensorError::BackwardError(_)) => CheckErrorKind::CheckFailure,
            GradCheckError::Tensor(_) => CheckErrorKind::HarnessContract,
            GradCheckError::InputGradientCountMismatch { .. }
            | GradCheckError::GradientShapeMismatch { .. }
            | GradCheckError::GradientDTypeMismatch { .. }
            | GradCheckError::DoubleBackpropViolation { .. }
            | GradCheckError::NumericalMismatch(_)
            | GradCheckError::FirstOrderGradientCountMismatch { .. }
            | GradCheckError::FirstOrderGradientMissing { .. }
            | GradCheckError::FirstOrderGradientNotDifferentiable { .. }
            | GradCheckError::SecondOrderGradientMissing { .. }
            | GradCheckError::Leak(_) => CheckErrorKind::CheckFailure,
        }
    }

    pub fn is_check_failure(&self) -> bool {
        self.kind() == CheckErrorKind::CheckFailure
    }
}

fn second_order_missing_message(
    missing: &[usize],
    num_inputs: &usize,
    num_outputs: &usize,
    graph_id: &str,
) -> String {
    missing
        .iter()
        .map(|i| {
            format!(
                "Second order gradient w.r.t. the input gradient {} (Total inputs: {}, outputs: {}) is missing on the graph '{}'. Maybe you need additional nonlinearity in the target function.",
                i, num_inputs, num_outputs, graph_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Owned copy of a tensor's values, kept in error reports instead of the tensor itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSnapshot {
    shape: Vec<usize>,
    buffer: Buffer,
}

impl TensorSnapshot {
    pub fn of(tensor: &Tensor) -> Self {
        let guard = tensor.read_data();
        TensorSnapshot {
            shape: guard.shape.clone(),
            buffer: guard.buffer.as_ref().clone(),
        }
    }

    pub(crate) fn from_values(shape: Vec<usize>, values: Vec<f64>, dtype: DType) -> Self {
        TensorSnapshot {
            shape,
            buffer: Buffer::from_f64_values(values, dtype),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.buffer.to_f64_vec()
    }
}

impl fmt::Display for TensorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_array(f, &self.buffer, &self.shape)
    }
}

/// Evidence for one differentiated variable whose analytic and numerical gradients disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMismatch {
    pub index: usize,
    /// `analytic - numerical`, signed.
    pub error: TensorSnapshot,
    pub analytic: TensorSnapshot,
    pub numerical: TensorSnapshot,
    pub eps: TensorSnapshot,
}

/// Whether a [`MismatchReport`] comes from the first- or second-order check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOrder {
    Backward,
    DoubleBackward,
}

/// Aggregated numerical-consistency failures of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchReport {
    pub order: CheckOrder,
    /// Number of differentiated variables.
    pub total: usize,
    pub graph_id: String,
    pub atol: f64,
    pub rtol: f64,
    pub failures: Vec<GradientMismatch>,
}

impl MismatchReport {
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|m| m.index).collect()
    }
}

impl fmt::Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.order {
            CheckOrder::Backward => "backward",
            CheckOrder::DoubleBackward => "double backward",
        };
        let indices = self
            .failed_indices()
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            f,
            "Numerical error in {} on inputs (out of {}): {}",
            what, self.total, indices
        )?;
        writeln!(f, "Graph: {}", self.graph_id)?;
        write!(f, "Atol: {}  Rtol: {}", self.atol, self.rtol)?;
        for m in &self.failures {
            write!(
                f,
                "\nError[{i}]:\n{}\nBackward gradients[{i}]:\n{}\nNumerical gradients[{i}]:\n{}\nEps[{i}] (perturbation in numerical gradients):\n{}",
                m.error,
                m.analytic,
                m.numerical,
                m.eps,
                i = m.index
            )?;
        }
        Ok(())
    }
}
