//! Differential gradient checking.
//!
//! [`check_backward`] and [`check_double_backward`] compare the gradients computed by the
//! reverse-mode engine ([`backward`](crate::autograd::backward)) against central-difference
//! estimates ([`numerical_gradient`](crate::autograd::numerical_gradient)) for a user
//! function, and fail if graph bookkeeping created during the check outlives it.
//!
//! All checking happens on disconnected copies of the caller's tensors (see
//! [`disconnect_inputs`]), so a check never adds graph state to them.

use crate::autograd::leak_tracker::ArrayBodyLeakTracker;
use crate::autograd::GraphId;
use crate::error::TensorError;
use crate::tensor::Tensor;
use log::{debug, warn};

mod double_backprop;
mod driver;
pub mod error;
mod first_order;
mod second_order;

pub use error::{
    CheckErrorKind, CheckOrder, GradCheckError, GradientMismatch, MismatchReport, TensorRole,
    TensorSnapshot,
};

use double_backprop::check_double_backprop_option;
use first_order::check_backward_computation;
use second_order::check_double_backward_computation;

/// Checks the first-order gradients of `func` at `inputs`.
///
/// Runs, each in its own leak-detection scope:
/// 1. a check that the engine honours both double-backprop modes for `func`;
/// 2. a comparison of backward gradients (seeded with `grad_outputs`) against numerical
///    gradients (perturbed by `eps`, one tensor per input). A gradient is consistent iff
///    `|analytic - numerical| <= atol + rtol * |numerical|` elementwise.
///
/// Inputs that do not require grad on the graph are not checked. When `graph_id` is `None`,
/// the graph is taken from the first input (see [`resolve_graph_id`]).
///
/// # Errors
/// A [`GradCheckError`]; use [`GradCheckError::kind`] to tell a misuse of the harness from
/// a failed check.
pub fn check_backward<F>(
    func: F,
    inputs: &[Tensor],
    grad_outputs: &[Tensor],
    eps: &[Tensor],
    atol: f64,
    rtol: f64,
    graph_id: Option<&GraphId>,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Vec<Tensor>, TensorError>,
{
    let first = inputs.first().ok_or(GradCheckError::EmptyInputs)?;
    let graph_id = resolve_graph_id(first, graph_id);
    let func = |xs: &[Tensor]| -> Result<Vec<Tensor>, GradCheckError> { Ok(func(xs)?) };
    debug!(
        "check_backward: {} input(s) on graph '{}' (atol={}, rtol={})",
        inputs.len(),
        graph_id,
        atol,
        rtol
    );

    with_leak_detection(|| check_double_backprop_option(&func, inputs, &graph_id))?;
    with_leak_detection(|| {
        check_backward_computation(&func, inputs, grad_outputs, eps, atol, rtol, &graph_id)
    })
}

/// Checks the second-order gradients of `func` at `inputs`.
///
/// Every input and every tensor in `grad_outputs` must require grad on the graph.
/// `grad_grad_inputs` seeds the second-order pass (one per input) and `eps` holds one
/// perturbation per input followed by one per output gradient.
///
/// # Errors
/// See [`check_backward`].
#[allow(clippy::too_many_arguments)]
pub fn check_double_backward<F>(
    func: F,
    inputs: &[Tensor],
    grad_outputs: &[Tensor],
    grad_grad_inputs: &[Tensor],
    eps: &[Tensor],
    atol: f64,
    rtol: f64,
    graph_id: Option<&GraphId>,
) -> Result<(), GradCheckError>
where
    F: Fn(&[Tensor]) -> Result<Vec<Tensor>, TensorError>,
{
    let first = inputs.first().ok_or(GradCheckError::EmptyInputs)?;
    let graph_id = resolve_graph_id(first, graph_id);
    let func = |xs: &[Tensor]| -> Result<Vec<Tensor>, GradCheckError> { Ok(func(xs)?) };
    debug!(
        "check_double_backward: {} input(s), {} output gradient(s) on graph '{}'",
        inputs.len(),
        grad_outputs.len(),
        graph_id
    );

    with_leak_detection(|| {
        check_double_backward_computation(
            &func,
            &disconnect_inputs(inputs),
            &disconnect_inputs(grad_outputs),
            grad_grad_inputs,
            eps,
            atol,
            rtol,
            &graph_id,
        )
    })
}

/// Returns copies of `tensors` sharing their values but none of their graph nodes.
///
/// Each copy requires grad on exactly the graphs its original requires grad on, as a fresh
/// leaf. Whatever a check records on the copies therefore never reaches the originals.
pub fn disconnect_inputs(tensors: &[Tensor]) -> Vec<Tensor> {
    tensors
        .iter()
        .map(|tensor| {
            let copy = tensor.as_grad_stopped();
            for graph_id in tensor.graph_ids() {
                copy.require_grad(&graph_id);
            }
            copy
        })
        .collect()
}

/// Graph a check runs on when none is given.
///
/// An explicit `graph_id` always wins. Otherwise the default graph is used if `tensor`
/// requires grad on it, else the first (by name) graph `tensor` requires grad on, else the
/// default graph.
pub fn resolve_graph_id(tensor: &Tensor, graph_id: Option<&GraphId>) -> GraphId {
    if let Some(graph_id) = graph_id {
        return graph_id.clone();
    }
    let default = GraphId::default();
    if tensor.is_grad_required(&default) {
        return default;
    }
    tensor.graph_ids().into_iter().next().unwrap_or(default)
}

/// Runs `check` with a fresh leak tracker active, then fails if any tensor body created
/// during the check is still alive. A failing check is reported before any leak.
fn with_leak_detection<F>(check: F) -> Result<(), GradCheckError>
where
    F: FnOnce() -> Result<(), GradCheckError>,
{
    let tracker = ArrayBodyLeakTracker::new();
    {
        let _scope = tracker.scope();
        check()?;
    }
    match tracker.leak_report() {
        None => Ok(()),
        Some(report) => {
            warn!("{}", report);
            Err(GradCheckError::Leak(report))
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
