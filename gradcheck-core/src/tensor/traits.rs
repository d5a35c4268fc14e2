// src/tensor/traits.rs

use crate::buffer::Buffer;
use crate::tensor::Tensor;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

impl Clone for Tensor {
    /// Clones the Tensor. This is a shallow clone that increases the reference count
    /// of the underlying body: the clone *is* the same storage object.
    fn clone(&self) -> Self {
        Tensor {
            data: Arc::clone(&self.data),
        }
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.read() {
            Ok(guard) => write!(
                f,
                "Tensor(shape={:?}, dtype={:?}, requires_grad_on={:?}, grad_on={:?})",
                guard.shape,
                guard.dtype,
                sorted_names(guard.nodes.keys().map(|g| g.name())),
                sorted_names(guard.grads.keys().map(|g| g.name())),
            ),
            Err(_) => write!(f, "Tensor(Error: RwLock poisoned)"),
        }
    }
}

/// Renders values, shape and dtype, e.g. `array([6.0], shape=(1,), dtype=float32)`.
impl Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = match self.data.read() {
            Ok(guard) => guard,
            Err(_) => return write!(f, "array(<poisoned>)"),
        };
        write_array(f, &guard.buffer, &guard.shape)
    }
}

/// Shared by every array-like `Display` in the crate.
pub(crate) fn write_array(f: &mut fmt::Formatter<'_>, buffer: &Buffer, shape: &[usize]) -> fmt::Result {
    write!(f, "array([")?;
    match buffer {
        Buffer::F32(values) => write_values(f, values)?,
        Buffer::F64(values) => write_values(f, values)?,
    }
    write!(f, "], shape={}, dtype={})", format_shape(shape), buffer.dtype())
}

fn write_values<T: Debug>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?}", value)?;
    }
    Ok(())
}

/// Python-tuple style shape: `()`, `(3,)`, `(2, 3)`.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [d] => format!("({},)", d),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.collect();
    names.sort_unstable();
    names
}
