use crate::autograd::backward::DoubleBackprop;
use crate::autograd::graph::ArrayNode;
use crate::autograd::GraphId;
use crate::buffer::Buffer;
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Defines the interface for the backward pass of a differentiable tensor operation.
///
/// Any operation that creates a non-leaf `Tensor` registers an implementation through
/// [`record_op`](crate::ops::record_op). During a reverse pass the engine calls
/// [`backward`](BackwardOp::backward) once per graph node produced by the op.
///
/// Implementations should compute input gradients with differentiable tensor ops
/// (`mul_op`, `add_op`, ...) and restore their saved inputs through
/// [`RetainedInput::restore`]: that is what makes the result itself differentiable
/// when the pass runs with [`DoubleBackprop::Enable`].
///
/// The trait requires `Debug + Send + Sync` because the `Arc<dyn BackwardOp>` is shared
/// by the op nodes of every graph the output participates in.
pub trait BackwardOp: Debug + Send + Sync {
    /// Computes the gradients of the op's inputs given `grad_output` (dL/dOutput).
    ///
    /// # Returns
    /// One entry per forward input, in the forward order. `None` means "no gradient for
    /// this input". Each present gradient is expected (but not required, the checker
    /// exists to catch that) to match its input's shape and dtype.
    fn backward(
        &self,
        grad_output: &Tensor,
        ctx: &BackwardContext,
    ) -> Result<Vec<Option<Tensor>>, TensorError>;
}

/// Read-only information about the reverse pass a [`BackwardOp`] is called from.
#[derive(Debug, Clone)]
pub struct BackwardContext {
    graph_id: GraphId,
    double_backprop: DoubleBackprop,
}

impl BackwardContext {
    pub(crate) fn new(graph_id: GraphId, double_backprop: DoubleBackprop) -> Self {
        BackwardContext {
            graph_id,
            double_backprop,
        }
    }

    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    pub fn double_backprop(&self) -> DoubleBackprop {
        self.double_backprop
    }
}

/// A forward input saved for the backward pass.
///
/// Keeps the values (shared buffer) and the input's graph nodes, but not the input's body,
/// so saving an input never extends the lifetime of the caller's tensor.
#[derive(Debug, Clone)]
pub struct RetainedInput {
    buffer: Arc<Buffer>,
    shape: Vec<usize>,
    nodes: HashMap<GraphId, Arc<ArrayNode>>,
}

impl RetainedInput {
    pub fn new(tensor: &Tensor) -> Self {
        let guard = tensor.read_data();
        RetainedInput {
            buffer: Arc::clone(&guard.buffer),
            shape: guard.shape.clone(),
            nodes: guard.nodes.clone(),
        }
    }

    /// Rebuilds the saved input as a fresh tensor.
    ///
    /// The tensor is connected to the original input's graph nodes, except on the graph
    /// being differentiated when double backprop is disabled.
    pub fn restore(&self, ctx: &BackwardContext) -> Result<Tensor, TensorError> {
        let mut data = TensorData::from_buffer(Arc::clone(&self.buffer), self.shape.clone())?;
        data.nodes = self
            .nodes
            .iter()
            .filter(|(graph_id, _)| {
                ctx.double_backprop == DoubleBackprop::Enable || *graph_id != ctx.graph_id()
            })
            .map(|(graph_id, node)| (graph_id.clone(), Arc::clone(node)))
            .collect();
        Ok(Tensor::from_data(data))
    }
}
