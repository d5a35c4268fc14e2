// src/tensor_data.rs
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::autograd::graph::ArrayNode;
use crate::autograd::GraphId;
use crate::buffer::Buffer;
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::types::DType;

/// Internal storage and metadata for a Tensor (the tensor "body").
///
/// It is wrapped in `Arc<RwLock<TensorData>>` by the `Tensor` struct. Two `Tensor`
/// handles are the same storage object iff they point at the same `TensorData`.
///
/// Autograd state is kept per graph identity:
/// * `nodes` holds this body's graph node for every graph it requires grad on.
///   A node links the body to the op that produced it (none for a leaf).
/// * `grads` holds the current gradient for a graph, if one was populated.
pub struct TensorData {
    /// Shared value storage. Views (e.g. grad-stopped copies) share this `Arc`.
    pub(crate) buffer: Arc<Buffer>,
    pub(crate) dtype: DType,
    pub(crate) shape: Vec<usize>,

    // --- Autograd Metadata ---
    pub(crate) nodes: HashMap<GraphId, Arc<ArrayNode>>,
    pub(crate) grads: HashMap<GraphId, Tensor>,
}

impl TensorData {
    /// Creates a new `TensorData` instance with the given f32 data and shape.
    ///
    /// # Errors
    /// Returns `TensorError::TensorCreationError` if the length of `data_vec` does not match
    /// the total number of elements specified by `shape`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TensorError> {
        Self::from_buffer(Arc::new(Buffer::F32(data_vec)), shape)
    }

    /// Creates a new `TensorData` instance with the given f64 data and shape.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, TensorError> {
        Self::from_buffer(Arc::new(Buffer::F64(data_vec)), shape)
    }

    /// Creates a body over an existing (possibly shared) buffer.
    ///
    /// The new body has no graph nodes and no gradients.
    pub(crate) fn from_buffer(buffer: Arc<Buffer>, shape: Vec<usize>) -> Result<Self, TensorError> {
        let numel: usize = shape.iter().product();
        let data_len = buffer.len();
        if data_len != numel {
            return Err(TensorError::TensorCreationError { data_len, shape });
        }
        Ok(TensorData {
            dtype: buffer.dtype(),
            buffer,
            shape,
            nodes: HashMap::new(),
            grads: HashMap::new(),
        })
    }

    /// Provides immutable access to the underlying shared data buffer.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub(crate) fn array_node(&self, graph_id: &GraphId) -> Option<&Arc<ArrayNode>> {
        self.nodes.get(graph_id)
    }
}

impl Debug for TensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut graphs: Vec<&str> = self.nodes.keys().map(GraphId::name).collect();
        graphs.sort_unstable();
        let mut grads: Vec<&str> = self.grads.keys().map(GraphId::name).collect();
        grads.sort_unstable();
        f.debug_struct("TensorData")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("requires_grad_on", &graphs)
            .field("grad_on", &grads)
            .finish()
    }
}
