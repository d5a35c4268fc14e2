use crate::autograd::graph::ArrayNode;
use crate::autograd::GraphId;
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use std::sync::Arc;

/// Per-graph autograd state of a tensor.
///
/// Every method takes the graph identity explicitly: state recorded for one graph is never
/// visible through another.
impl Tensor {
    /// Marks this tensor as requiring gradients on `graph_id`, making it a leaf of that graph.
    ///
    /// Calling it again on a graph the tensor already participates in is a no-op (the
    /// existing node, leaf or not, is kept).
    pub fn require_grad(&self, graph_id: &GraphId) -> &Self {
        let weak = Arc::downgrade(&self.data);
        let mut guard = self.write_data();
        let (shape, dtype) = (guard.shape.clone(), guard.dtype);
        guard
            .nodes
            .entry(graph_id.clone())
            .or_insert_with(|| Arc::new(ArrayNode::new_leaf(graph_id.clone(), weak, shape, dtype)));
        self
    }

    /// Checks if this tensor requires gradient computation on `graph_id`.
    pub fn is_grad_required(&self, graph_id: &GraphId) -> bool {
        self.read_data().nodes.contains_key(graph_id)
    }

    /// Returns the graphs this tensor requires gradients on, sorted by name.
    pub fn graph_ids(&self) -> Vec<GraphId> {
        let mut ids: Vec<GraphId> = self.read_data().nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns `true` unless this tensor was produced by a recorded op on `graph_id`.
    ///
    /// A tensor that does not participate in the graph at all counts as a leaf.
    pub fn is_leaf(&self, graph_id: &GraphId) -> bool {
        self.read_data()
            .array_node(graph_id)
            .map_or(true, |node| node.is_leaf())
    }

    /// Returns a clone (handle) of the gradient for `graph_id`, if one is populated.
    pub fn grad(&self, graph_id: &GraphId) -> Option<Tensor> {
        self.read_data().grads.get(graph_id).cloned()
    }

    /// Sets the gradient for `graph_id`.
    ///
    /// # Errors
    /// * `GradNotRequired` if the tensor does not require grad on the graph.
    /// * `GradientShapeMismatch` / `DTypeMismatch` if `grad` does not match this tensor.
    pub fn set_grad(&self, grad: Tensor, graph_id: &GraphId) -> Result<(), TensorError> {
        let (grad_shape, grad_dtype) = {
            let grad_guard = grad.read_data();
            (grad_guard.shape.clone(), grad_guard.dtype)
        };
        let mut guard = self.write_data();
        if !guard.nodes.contains_key(graph_id) {
            return Err(TensorError::GradNotRequired {
                graph_id: graph_id.to_string(),
            });
        }
        if guard.shape != grad_shape {
            return Err(TensorError::GradientShapeMismatch {
                expected: guard.shape.clone(),
                actual: grad_shape,
            });
        }
        if guard.dtype != grad_dtype {
            return Err(TensorError::DTypeMismatch {
                expected: guard.dtype,
                actual: grad_dtype,
                operation: "set_grad".to_string(),
            });
        }
        guard.grads.insert(graph_id.clone(), grad);
        Ok(())
    }

    /// Clears the gradient for `graph_id`. Harmless if none is set.
    pub fn clear_grad(&self, graph_id: &GraphId) {
        self.write_data().grads.remove(graph_id);
    }

    /// Removes and returns the gradient for `graph_id`.
    pub(crate) fn take_grad(&self, graph_id: &GraphId) -> Option<Tensor> {
        self.write_data().grads.remove(graph_id)
    }

    /// Returns a view sharing this tensor's values but connected to no graph at all.
    pub fn as_grad_stopped(&self) -> Tensor {
        let buffer = self.buffer();
        let shape = self.shape();
        Tensor::from_data(TensorData {
            dtype: buffer.dtype(),
            buffer,
            shape,
            nodes: Default::default(),
            grads: Default::default(),
        })
    }

    /// Returns a view sharing this tensor's values, disconnected from the given graphs only.
    ///
    /// On the remaining graphs the view shares this tensor's nodes, so gradients reaching the
    /// view flow to this tensor.
    pub fn as_grad_stopped_on(&self, graph_ids: &[GraphId]) -> Tensor {
        let stopped = self.as_grad_stopped();
        {
            let source = self.read_data();
            let mut guard = stopped.write_data();
            guard.nodes = source
                .nodes
                .iter()
                .filter(|(graph_id, _)| !graph_ids.contains(graph_id))
                .map(|(graph_id, node)| (graph_id.clone(), Arc::clone(node)))
                .collect();
        }
        stopped
    }

    /// Returns a new body sharing this tensor's values and its nodes on every graph.
    ///
    /// Backward ops that pass a gradient through unchanged return a view, so the gradient
    /// they produce is never the same storage object as the one they received.
    pub fn view(&self) -> Tensor {
        self.as_grad_stopped_on(&[])
    }

    pub(crate) fn array_node(&self, graph_id: &GraphId) -> Option<Arc<ArrayNode>> {
        self.read_data().array_node(graph_id).cloned()
    }
}

#[cfg(test)]
#[path = "autograd_methods_test.rs"]
mod tests;
