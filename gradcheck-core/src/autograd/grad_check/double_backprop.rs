use super::disconnect_inputs;
use super::driver::{backward_gradients, ForwardFn};
use super::error::GradCheckError;
use crate::autograd::{DoubleBackprop, GraphId};
use crate::tensor::Tensor;
use log::debug;

/// Verifies that the engine honours both [`DoubleBackprop`] modes for `func`.
///
/// Each output is squared first, so the gradients depend on the inputs even when `func` is
/// linear. With double backprop disabled no gradient may require grad on `graph_id`; with it
/// enabled every gradient must. All violations are reported together.
pub(crate) fn check_double_backprop_option(
    func: &ForwardFn<'_>,
    inputs: &[Tensor],
    graph_id: &GraphId,
) -> Result<(), GradCheckError> {
    let nonlinear_func = |xs: &[Tensor]| -> Result<Vec<Tensor>, GradCheckError> {
        let mut outputs = Vec::new();
        for y in func(xs)? {
            outputs.push(y.mul(&y)?);
        }
        Ok(outputs)
    };

    let mut violations = Vec::new();
    for mode in [DoubleBackprop::Disable, DoubleBackprop::Enable] {
        debug!("double-backprop contract: {:?} on graph '{}'", mode, graph_id);
        let inputs_disconnected = disconnect_inputs(inputs);
        let grads = backward_gradients(
            &nonlinear_func,
            &inputs_disconnected,
            None,
            graph_id,
            mode,
        )?;

        let total = grads.len();
        for (i, grad) in grads.iter().enumerate() {
            let Some(grad) = grad else { continue };
            let connected = grad.is_grad_required(graph_id);
            match mode {
                // Unreachable while the engine stops every gradient under `Disable`.
                DoubleBackprop::Disable if connected => violations.push(format!(
                    "Gradient {} / {} is connected to the graph '{}' even when double-backprop is disabled.",
                    i, total, graph_id
                )),
                DoubleBackprop::Enable if !connected => violations.push(format!(
                    "Gradient {} / {} is not connected to the graph '{}' even when double-backprop is enabled.",
                    i, total, graph_id
                )),
                _ => {}
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(GradCheckError::DoubleBackpropViolation { violations })
    }
}

#[cfg(test)]
#[path = "double_backprop_test.rs"]
mod tests;
