use crate::autograd::backward_op::BackwardContext;
use crate::autograd::graph::{node_id, topological_sort, ArrayNode, NodeId};
use crate::autograd::GraphId;
use crate::error::TensorError;
use crate::ops::arithmetic::add::add_op;
use crate::tensor::{ones_like, Tensor};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;

/// Whether the gradients computed by a reverse pass are themselves recorded on the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoubleBackprop {
    /// Backward computations are recorded: the resulting gradients require grad on the
    /// graph and can be differentiated again.
    Enable,
    /// Resulting gradients are disconnected from the graph being differentiated.
    #[default]
    Disable,
}

/// Runs exactly one reverse pass over `outputs`, restricted to `graph_id`.
///
/// Each output's seed is its current gradient on the graph (consumed by the pass) or, if none
/// is set, a tensor of ones. An output listed more than once is seeded once. Gradients
/// reaching leaf tensors are accumulated into their gradient record for `graph_id`; leaves
/// whose tensor has already been dropped are skipped.
/// Gradient state on other graphs is never read or written.
///
/// # Errors
/// * `GradNotRequired` if an output does not require grad on `graph_id`.
/// * `BackwardError` if a `BackwardOp` returns the wrong number of gradients, or a gradient
///   whose shape or dtype differs from its input's.
/// * Any error raised by a `BackwardOp` or by gradient accumulation.
pub fn backward(
    outputs: &[&Tensor],
    graph_id: &GraphId,
    double_backprop: DoubleBackprop,
) -> Result<(), TensorError> {
    debug!(
        "backward on graph '{}' from {} output(s), double backprop {:?}",
        graph_id,
        outputs.len(),
        double_backprop
    );
    let ctx = BackwardContext::new(graph_id.clone(), double_backprop);

    // --- Seeds ---
    let mut grad_map: HashMap<NodeId, Tensor> = HashMap::new();
    let mut roots: Vec<Arc<ArrayNode>> = Vec::with_capacity(outputs.len());
    for output in outputs {
        let node = output
            .array_node(graph_id)
            .ok_or_else(|| TensorError::GradNotRequired {
                graph_id: graph_id.to_string(),
            })?;
        if roots.iter().any(|root| node_id(root) == node_id(&node)) {
            continue;
        }
        let seed = match output.take_grad(graph_id) {
            Some(grad) => grad,
            None => ones_like(output)?,
        };
        accumulate(&mut grad_map, node_id(&node), stop_if_disabled(seed, &ctx))?;
        roots.push(node);
    }

    // --- Reverse topological traversal ---
    let sorted_nodes = topological_sort(&roots);
    trace!("backward visits {} node(s)", sorted_nodes.len());

    for node in &sorted_nodes {
        let Some(grad) = grad_map.remove(&node_id(node)) else {
            continue;
        };
        match node.op.as_ref() {
            Some(op) => {
                trace!("backward through '{}'", op.name);
                let input_grads = op.backward.backward(&grad, &ctx)?;
                if input_grads.len() != op.inputs.len() {
                    return Err(TensorError::BackwardError(format!(
                        "BackwardOp '{}' returned {} gradients, but expected {}",
                        op.name,
                        input_grads.len(),
                        op.inputs.len()
                    )));
                }
                for (input_node, input_grad) in op.inputs.iter().zip(input_grads) {
                    if let (Some(input_node), Some(input_grad)) = (input_node, input_grad) {
                        check_input_grad(op.name, input_node, &input_grad)?;
                        accumulate(
                            &mut grad_map,
                            node_id(input_node),
                            stop_if_disabled(input_grad, &ctx),
                        )?;
                    }
                }
            }
            None => {
                // Leaf: store into the owning body if it is still alive.
                if let Some(body) = node.body.upgrade() {
                    let leaf = Tensor { data: body };
                    let total = match leaf.take_grad(graph_id) {
                        Some(existing) => add_op(&existing, &grad)?,
                        None => grad,
                    };
                    leaf.write_data().grads.insert(graph_id.clone(), total);
                }
            }
        }
    }
    Ok(())
}

fn accumulate(
    grad_map: &mut HashMap<NodeId, Tensor>,
    id: NodeId,
    grad: Tensor,
) -> Result<(), TensorError> {
    let total = match grad_map.remove(&id) {
        Some(existing) => add_op(&existing, &grad)?,
        None => grad,
    };
    grad_map.insert(id, total);
    Ok(())
}

fn check_input_grad(
    op_name: &str,
    input_node: &ArrayNode,
    input_grad: &Tensor,
) -> Result<(), TensorError> {
    let (shape, dtype) = (input_grad.shape(), input_grad.dtype());
    if shape != input_node.shape || dtype != input_node.dtype {
        return Err(TensorError::BackwardError(format!(
            "BackwardOp '{}' returned a gradient of shape {:?} and dtype {} for an input of shape {:?} and dtype {}",
            op_name, shape, dtype, input_node.shape, input_node.dtype
        )));
    }
    Ok(())
}

fn stop_if_disabled(grad: Tensor, ctx: &BackwardContext) -> Tensor {
    if ctx.double_backprop() == DoubleBackprop::Disable && grad.is_grad_required(ctx.graph_id()) {
        grad.as_grad_stopped_on(std::slice::from_ref(ctx.graph_id()))
    } else {
        grad
    }
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
