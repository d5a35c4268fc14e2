use crate::autograd::{BackwardOp, GraphId};
use crate::tensor_data::TensorData;
use crate::types::DType;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// Identity of a graph node during traversal (pointer address of the `ArrayNode`).
pub(crate) type NodeId = *const ArrayNode;

/// Per (tensor body, graph) record.
///
/// Links the body to the op that produced it under `graph_id` (`op == None` for a leaf).
/// The body is referenced weakly: bodies own their nodes, never the other way around.
/// Shape and dtype are copied from the body so gradients can be validated after it is gone.
pub struct ArrayNode {
    pub(crate) graph_id: GraphId,
    pub(crate) body: Weak<RwLock<TensorData>>,
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DType,
    pub(crate) op: Option<Arc<OpNode>>,
}

/// An op recorded on one graph. Inputs that do not participate in the graph are `None`.
pub struct OpNode {
    pub(crate) name: &'static str,
    pub(crate) inputs: Vec<Option<Arc<ArrayNode>>>,
    pub(crate) backward: Arc<dyn BackwardOp>,
}

impl ArrayNode {
    pub(crate) fn new_leaf(
        graph_id: GraphId,
        body: Weak<RwLock<TensorData>>,
        shape: Vec<usize>,
        dtype: DType,
    ) -> Self {
        ArrayNode {
            graph_id,
            body,
            shape,
            dtype,
            op: None,
        }
    }

    pub(crate) fn new_output(
        graph_id: GraphId,
        body: Weak<RwLock<TensorData>>,
        shape: Vec<usize>,
        dtype: DType,
        op: Arc<OpNode>,
    ) -> Self {
        ArrayNode {
            graph_id,
            body,
            shape,
            dtype,
            op: Some(op),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }
}

impl fmt::Debug for ArrayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayNode")
            .field("graph_id", &self.graph_id)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("op", &self.op.as_ref().map(|op| op.name))
            .field("body_alive", &(self.body.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for OpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpNode")
            .field("name", &self.name)
            .field("num_inputs", &self.inputs.len())
            .field("backward", &self.backward)
            .finish()
    }
}

pub(crate) fn node_id(node: &Arc<ArrayNode>) -> NodeId {
    Arc::as_ptr(node)
}

/// Returns every node reachable from `roots`, each node placed before all of its inputs.
///
/// Processing the result front to back therefore visits every consumer before its producers,
/// which is the order a reverse pass needs.
pub(crate) fn topological_sort(roots: &[Arc<ArrayNode>]) -> Vec<Arc<ArrayNode>> {
    let mut visited = HashSet::new();
    let mut sorted_list = Vec::new();
    for root in roots {
        build_topo(root, &mut visited, &mut sorted_list);
    }
    sorted_list.reverse();
    sorted_list
}

/// Post-order DFS: a node is pushed after all of its inputs.
fn build_topo(
    node: &Arc<ArrayNode>,
    visited: &mut HashSet<NodeId>,
    sorted_list: &mut Vec<Arc<ArrayNode>>,
) {
    if !visited.insert(node_id(node)) {
        return;
    }
    if let Some(op) = node.op.as_ref() {
        for input in op.inputs.iter().flatten() {
            build_topo(input, visited, sorted_list);
        }
    }
    sorted_list.push(Arc::clone(node));
}
