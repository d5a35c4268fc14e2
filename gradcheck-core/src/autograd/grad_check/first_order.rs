use super::disconnect_inputs;
use super::driver::{backward_gradients, ForwardFn};
use super::error::{CheckOrder, GradCheckError, GradientMismatch, MismatchReport, TensorSnapshot};
use crate::autograd::{numerical_gradient, DoubleBackprop, GraphId};
use crate::tensor::Tensor;
use log::debug;

/// Compares backward gradients of `func` against central-difference estimates.
///
/// The backward pass runs on disconnected copies of `inputs`; the numerical estimate is taken
/// on `inputs` themselves (the estimator never attaches graph state to them).
pub(crate) fn check_backward_computation(
    func: &ForwardFn<'_>,
    inputs: &[Tensor],
    grad_outputs: &[Tensor],
    eps: &[Tensor],
    atol: f64,
    rtol: f64,
    graph_id: &GraphId,
) -> Result<(), GradCheckError> {
    let total = inputs.len();

    let inputs_disconnected = disconnect_inputs(inputs);
    let backward_grads = backward_gradients(
        func,
        &inputs_disconnected,
        Some(grad_outputs),
        graph_id,
        DoubleBackprop::Disable,
    )?;
    if backward_grads.len() != total {
        return Err(GradCheckError::InputGradientCountMismatch {
            expected: total,
            actual: backward_grads.len(),
        });
    }
    // `backward` already rejects misshapen op gradients; this covers the stored leaf records.
    for (index, (grad, input)) in backward_grads.iter().zip(inputs).enumerate() {
        let Some(grad) = grad else { continue };
        let (actual, expected) = (grad.shape(), input.shape());
        if actual != expected {
            return Err(GradCheckError::GradientShapeMismatch {
                index,
                total,
                actual,
                expected,
            });
        }
        let (actual, expected) = (grad.dtype(), input.dtype());
        if actual != expected {
            return Err(GradCheckError::GradientDTypeMismatch {
                index,
                total,
                actual,
                expected,
            });
        }
    }

    debug!("computing numerical gradients for {} input(s)", total);
    let numerical_grads = numerical_gradient(func, inputs, grad_outputs, eps)?;
    assert_eq!(numerical_grads.len(), total, "numerical gradient count");
    for (numerical, input) in numerical_grads.iter().zip(inputs) {
        assert_eq!(numerical.shape(), input.shape(), "numerical gradient shape");
        assert_eq!(numerical.dtype(), input.dtype(), "numerical gradient dtype");
    }

    let failures = collect_mismatches(&backward_grads, &numerical_grads, eps, atol, rtol);
    if failures.is_empty() {
        return Ok(());
    }
    Err(GradCheckError::NumericalMismatch(MismatchReport {
        order: CheckOrder::Backward,
        total,
        graph_id: graph_id.to_string(),
        atol,
        rtol,
        failures,
    }))
}

/// Elementwise comparison of every present analytic gradient with its numerical estimate.
///
/// A gradient passes iff `|analytic - numerical| <= atol + rtol * |numerical|` holds for
/// every element. Absent analytic gradients are skipped.
pub(super) fn collect_mismatches(
    analytic_grads: &[Option<Tensor>],
    numerical_grads: &[Tensor],
    eps: &[Tensor],
    atol: f64,
    rtol: f64,
) -> Vec<GradientMismatch> {
    let mut failures = Vec::new();
    for (index, (analytic, numerical)) in analytic_grads.iter().zip(numerical_grads).enumerate() {
        let Some(analytic) = analytic else { continue };
        // Differing shapes count as inconsistent.
        if analytic.all_close(numerical, atol, rtol).unwrap_or(false) {
            continue;
        }

        let analytic_values = analytic.to_f64_vec();
        let numerical_values = numerical.to_f64_vec();

        let error: Vec<f64> = analytic_values
            .iter()
            .zip(&numerical_values)
            .map(|(a, n)| a - n)
            .collect();
        failures.push(GradientMismatch {
            index,
            error: TensorSnapshot::from_values(analytic.shape(), error, analytic.dtype()),
            analytic: TensorSnapshot::of(analytic),
            numerical: TensorSnapshot::of(numerical),
            eps: TensorSnapshot::of(&eps[index]),
        });
    }
    failures
}

#[cfg(test)]
#[path = "first_order_test.rs"]
mod tests;
