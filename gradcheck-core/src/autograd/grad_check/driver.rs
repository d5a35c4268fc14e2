use super::error::GradCheckError;
use crate::autograd::{backward, DoubleBackprop, GraphId};
use crate::ops::add_op;
use crate::tensor::Tensor;
use log::trace;

/// A forward function as seen by the checkers.
pub(crate) type ForwardFn<'a> = dyn Fn(&[Tensor]) -> Result<Vec<Tensor>, GradCheckError> + 'a;

/// Evaluates `func` once and runs exactly one reverse pass on `graph_id`.
///
/// Returns one entry per input: its gradient if it requires grad on the graph and one was
/// produced, `None` otherwise. Gradients left on the inputs by a backward pass inside `func`
/// are cleared before the pass, so they never leak into the result.
pub(crate) fn backward_gradients(
    func: &ForwardFn<'_>,
    inputs: &[Tensor],
    grad_outputs: Option<&[Tensor]>,
    graph_id: &GraphId,
    double_backprop: DoubleBackprop,
) -> Result<Vec<Option<Tensor>>, GradCheckError> {
    for (index, input) in inputs.iter().enumerate() {
        if !input.is_leaf(graph_id) {
            return Err(GradCheckError::InputNotLeaf {
                index,
                graph_id: graph_id.to_string(),
            });
        }
    }

    let outputs = func(inputs)?;

    for (i, input) in inputs.iter().enumerate() {
        for (j, output) in outputs.iter().enumerate() {
            if input.is_same(output) && input.is_grad_required(graph_id) {
                return Err(GradCheckError::IdenticalInputOutput {
                    input: i,
                    output: j,
                });
            }
        }
    }

    if let Some(grad_outputs) = grad_outputs {
        if outputs.len() != grad_outputs.len() {
            return Err(GradCheckError::GradOutputCountMismatch {
                outputs: outputs.len(),
                grad_outputs: grad_outputs.len(),
            });
        }
        // An output returned more than once receives the sum of its seeds.
        let mut seeded: Vec<&Tensor> = Vec::new();
        for (output, grad_output) in outputs.iter().zip(grad_outputs) {
            if !output.is_grad_required(graph_id) {
                continue;
            }
            let seed = if seeded.iter().any(|earlier| earlier.is_same(output)) {
                match output.take_grad(graph_id) {
                    Some(existing) => add_op(&existing, grad_output)?,
                    None => grad_output.clone(),
                }
            } else {
                seeded.push(output);
                grad_output.clone()
            };
            output.set_grad(seed, graph_id)?;
        }
    }

    for input in inputs {
        if input.is_grad_required(graph_id) {
            input.clear_grad(graph_id);
        }
    }

    let outputs_requiring_grad: Vec<&Tensor> = outputs
        .iter()
        .filter(|output| output.is_grad_required(graph_id))
        .collect();
    trace!(
        "reverse pass over {} / {} output(s) on graph '{}'",
        outputs_requiring_grad.len(),
        outputs.len(),
        graph_id
    );
    backward(&outputs_requiring_grad, graph_id, double_backprop)?;

    Ok(inputs
        .iter()
        .map(|input| {
            if input.is_grad_required(graph_id) {
                input.grad(graph_id)
            } else {
                None
            }
        })
        .collect())
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
