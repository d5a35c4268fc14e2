//! Multi-graph reverse-mode differentiation and the tooling to verify it.
//!
//! - [`graph_id`]: graph identities partitioning gradient tracking.
//! - [`graph`] / [`backward_op`]: the recorded computation and the per-op backward contract.
//! - [`backward()`]: the reverse pass.
//! - [`numerical_gradient`]: central finite differences.
//! - [`grad_check`]: the first- and second-order gradient checks.
//! - [`leak_tracker`]: detection of tensor bodies surviving a checked region.

pub mod backward;
pub mod backward_op;
pub mod grad_check;
pub mod graph;
pub mod graph_id;
pub mod leak_tracker;
pub mod numerical_gradient;

pub use backward::{backward, DoubleBackprop};
pub use backward_op::{BackwardContext, BackwardOp, RetainedInput};
pub use graph_id::GraphId;
pub use leak_tracker::{ArrayBodyLeakTracker, LeakDetectionScope};
pub use numerical_gradient::numerical_gradient;
