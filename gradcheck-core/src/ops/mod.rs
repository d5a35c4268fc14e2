//! # Tensor Operations Module (`ops`)
//!
//! Differentiable elementwise operations used by forward functions under check.
//!
//! ## Structure:
//!
//! - **`_op` Functions:** Each operation has a core function (`xxx_op`) that performs the
//!   forward computation and, if any input participates in a graph, links the output into
//!   those graphs with [`record_op`]. `Tensor` methods (`a.mul(&b)`) are thin wrappers.
//! - **`Backward` Structs:** Each operation has a struct implementing
//!   [`BackwardOp`](crate::autograd::BackwardOp) that saves its inputs as
//!   [`RetainedInput`](crate::autograd::RetainedInput)s and expresses the chain rule with
//!   the same `_op` functions, so gradients are differentiable again when requested.
//!
//! Operations require operands of identical shape and dtype (no broadcasting).

use crate::autograd::graph::{ArrayNode, OpNode};
use crate::autograd::{BackwardOp, GraphId};
use crate::buffer::Buffer;
use crate::error::TensorError;
use crate::tensor::Tensor;
use crate::tensor_data::TensorData;
use crate::types::DType;
use num_traits::{Float, NumCast};
use std::sync::Arc;

pub mod arithmetic;
pub mod comparison;

pub use arithmetic::{add_op, add_scalar_op, mul_op, mul_scalar_op, neg_op, sub_op};
pub use comparison::{all_close, is_close};

/// Links a freshly computed `output` into every graph any of `inputs` participates in.
///
/// One op node is created per graph; inputs that do not require grad on a graph get no edge
/// on it. `backward` is shared by all of those op nodes. If no input participates in any
/// graph, `output` is returned untouched.
///
/// This is the hook for defining custom differentiable operations.
pub fn record_op(
    name: &'static str,
    inputs: &[&Tensor],
    output: Tensor,
    backward: Arc<dyn BackwardOp>,
) -> Tensor {
    let mut graphs: Vec<GraphId> = Vec::new();
    for input in inputs {
        for graph_id in input.graph_ids() {
            if !graphs.contains(&graph_id) {
                graphs.push(graph_id);
            }
        }
    }
    if graphs.is_empty() {
        return output;
    }

    let body = Arc::downgrade(&output.data);
    let (shape, dtype) = (output.shape(), output.dtype());
    for graph_id in graphs {
        let op = Arc::new(OpNode {
            name,
            inputs: inputs.iter().map(|input| input.array_node(&graph_id)).collect(),
            backward: Arc::clone(&backward),
        });
        let node = Arc::new(ArrayNode::new_output(
            graph_id.clone(),
            body.clone(),
            shape.clone(),
            dtype,
            op,
        ));
        output.write_data().nodes.insert(graph_id, node);
    }
    output
}

/// Returns `true` if any of `inputs` requires grad on some graph.
pub(crate) fn needs_graph(inputs: &[&Tensor]) -> bool {
    inputs.iter().any(|input| !input.read_data().nodes.is_empty())
}

/// Applies a binary element-wise operation to two tensors of the same shape and dtype.
///
/// Only the forward values are computed; autograd linkage is the caller's job.
pub(crate) fn apply_binary_op<F32Op, F64Op>(
    a: &Tensor,
    b: &Tensor,
    op_f32: F32Op,
    op_f64: F64Op,
    op_name: &str,
) -> Result<Tensor, TensorError>
where
    F32Op: Fn(f32, f32) -> f32,
    F64Op: Fn(f64, f64) -> f64,
{
    // Snapshot each operand separately: `a` and `b` may be the same tensor.
    let (a_buffer, a_shape, a_dtype) = snapshot(a);
    let (b_buffer, b_shape, b_dtype) = snapshot(b);

    if a_shape != b_shape {
        return Err(TensorError::ShapeMismatch {
            expected: a_shape,
            actual: b_shape,
            operation: op_name.to_string(),
        });
    }
    if a_dtype != b_dtype {
        return Err(TensorError::DTypeMismatch {
            expected: a_dtype,
            actual: b_dtype,
            operation: op_name.to_string(),
        });
    }

    let buffer = match (a_buffer.as_ref(), b_buffer.as_ref()) {
        (Buffer::F32(a_data), Buffer::F32(b_data)) => {
            Buffer::F32(a_data.iter().zip(b_data).map(|(&x, &y)| op_f32(x, y)).collect())
        }
        (Buffer::F64(a_data), Buffer::F64(b_data)) => {
            Buffer::F64(a_data.iter().zip(b_data).map(|(&x, &y)| op_f64(x, y)).collect())
        }
        _ => {
            return Err(TensorError::InternalError(format!(
                "{}: buffer types disagree with dtypes",
                op_name
            )))
        }
    };
    let shape = a_shape;

    Ok(Tensor::from_data(TensorData::from_buffer(Arc::new(buffer), shape)?))
}

/// Applies `op(x, scalar)` to every element, with the scalar cast to the tensor's dtype.
pub(crate) fn apply_scalar_op<Op>(a: &Tensor, scalar: f64, op: Op) -> Result<Tensor, TensorError>
where
    Op: ScalarOp,
{
    let (a_buffer, shape, _) = snapshot(a);
    let buffer = match a_buffer.as_ref() {
        Buffer::F32(data) => Buffer::F32(scalar_kernel(data, scalar, &op)?),
        Buffer::F64(data) => Buffer::F64(scalar_kernel(data, scalar, &op)?),
    };
    Ok(Tensor::from_data(TensorData::from_buffer(Arc::new(buffer), shape)?))
}

fn snapshot(tensor: &Tensor) -> (Arc<Buffer>, Vec<usize>, DType) {
    let guard = tensor.read_data();
    (Arc::clone(&guard.buffer), guard.shape.clone(), guard.dtype)
}

/// Element/scalar combinator usable for every float dtype.
pub(crate) trait ScalarOp {
    fn name(&self) -> &'static str;
    fn apply<T: Float>(&self, x: T, scalar: T) -> T;
}

fn scalar_kernel<T: Float, Op: ScalarOp>(
    data: &[T],
    scalar: f64,
    op: &Op,
) -> Result<Vec<T>, TensorError> {
    let scalar = <T as NumCast>::from(scalar).ok_or_else(|| {
        TensorError::UnsupportedOperation(format!(
            "{}: scalar {} is not representable in the tensor dtype",
            op.name(),
            scalar
        ))
    })?;
    Ok(data.iter().map(|&x| op.apply(x, scalar)).collect())
}
