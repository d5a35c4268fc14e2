use super::driver::{backward_gradients, ForwardFn};
use super::error::{CheckOrder, GradCheckError, MismatchReport, TensorRole};
use super::first_order::collect_mismatches;
use crate::autograd::{numerical_gradient, DoubleBackprop, GraphId};
use crate::tensor::Tensor;
use log::debug;

/// Checks the gradients of the first-order gradients of `func`.
///
/// The differentiated function is `g(inputs ⧺ grad_outputs)`, the first-order input
/// gradients of `func` seeded with `grad_outputs`. Its numerical gradients (seeded with
/// `grad_grad_inputs`, perturbed by `eps`, which covers inputs then output gradients) are
/// compared with its backward gradients.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check_double_backward_computation(
    func: &ForwardFn<'_>,
    inputs: &[Tensor],
    grad_outputs: &[Tensor],
    grad_grad_inputs: &[Tensor],
    eps: &[Tensor],
    atol: f64,
    rtol: f64,
    graph_id: &GraphId,
) -> Result<(), GradCheckError> {
    let nin = inputs.len();
    let nout = grad_outputs.len();

    if grad_grad_inputs.len() != nin {
        return Err(GradCheckError::GradGradInputCountMismatch {
            inputs: nin,
            grad_grad_inputs: grad_grad_inputs.len(),
        });
    }
    // Unlike the first-order check, every input must be differentiable here.
    for (index, input) in inputs.iter().enumerate() {
        if !input.is_grad_required(graph_id) {
            return Err(GradCheckError::NotDifferentiable {
                role: TensorRole::Input,
                index,
                total: nin,
                graph_id: graph_id.to_string(),
            });
        }
    }
    for (index, grad_output) in grad_outputs.iter().enumerate() {
        if !grad_output.is_grad_required(graph_id) {
            return Err(GradCheckError::NotDifferentiable {
                role: TensorRole::OutputGradient,
                index,
                total: nout,
                graph_id: graph_id.to_string(),
            });
        }
    }

    let first_order_grad_func = |inputs_and_grad_outputs: &[Tensor]| -> Result<Vec<Tensor>, GradCheckError> {
        let (xs, gys) = inputs_and_grad_outputs.split_at(nin);
        for x in xs {
            x.require_grad(graph_id);
        }

        let grads = backward_gradients(func, xs, Some(gys), graph_id, DoubleBackprop::Enable)?;
        if grads.len() != nin {
            return Err(GradCheckError::FirstOrderGradientCountMismatch {
                expected: nin,
                actual: grads.len(),
            });
        }
        let mut first_order_grads = Vec::with_capacity(nin);
        for (index, grad) in grads.into_iter().enumerate() {
            match grad {
                Some(grad) => first_order_grads.push(grad),
                None => {
                    return Err(GradCheckError::FirstOrderGradientMissing { index, total: nin })
                }
            }
        }
        for (index, grad) in first_order_grads.iter().enumerate() {
            if !grad.is_grad_required(graph_id) {
                return Err(GradCheckError::FirstOrderGradientNotDifferentiable {
                    index,
                    total: nin,
                    graph_id: graph_id.to_string(),
                });
            }
        }
        Ok(first_order_grads)
    };

    let inputs_and_grad_outputs: Vec<Tensor> =
        inputs.iter().chain(grad_outputs).cloned().collect();

    debug!(
        "computing second-order numerical gradients over {} + {} array(s)",
        nin, nout
    );
    let numerical_grads = numerical_gradient(
        &first_order_grad_func,
        &inputs_and_grad_outputs,
        grad_grad_inputs,
        eps,
    )?;
    assert_eq!(numerical_grads.len(), nin + nout, "numerical gradient count");

    let backward_grads = backward_gradients(
        &first_order_grad_func,
        &inputs_and_grad_outputs,
        Some(grad_grad_inputs),
        graph_id,
        DoubleBackprop::Enable,
    )?;
    assert_eq!(backward_grads.len(), nin + nout, "backward gradient count");

    let missing: Vec<usize> = backward_grads
        .iter()
        .enumerate()
        .filter_map(|(i, grad)| grad.is_none().then_some(i))
        .collect();
    if !missing.is_empty() {
        return Err(GradCheckError::SecondOrderGradientMissing {
            missing,
            num_inputs: nin,
            num_outputs: nout,
            graph_id: graph_id.to_string(),
        });
    }

    let failures = collect_mismatches(&backward_grads, &numerical_grads, eps, atol, rtol);
    if failures.is_empty() {
        return Ok(());
    }
    Err(GradCheckError::NumericalMismatch(MismatchReport {
        order: CheckOrder::DoubleBackward,
        total: nin + nout,
        graph_id: graph_id.to_string(),
        atol,
        rtol,
        failures,
    }))
}
