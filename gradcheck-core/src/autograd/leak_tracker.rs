//! Detection of tensor bodies (and with them, graph nodes) that outlive a checked region.
//!
//! A tracker only observes bodies created on the current thread while one of its
//! [`LeakDetectionScope`]s is active. Bodies are recorded as weak references, so tracking
//! never extends a lifetime.

use crate::tensor::traits::format_shape;
use crate::tensor_data::TensorData;
use log::trace;
use std::cell::RefCell;
use std::fmt::Write;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::{Arc, RwLock, Weak};

type BodyList = Rc<RefCell<Vec<Weak<RwLock<TensorData>>>>>;

thread_local! {
    static ACTIVE_TRACKER: RefCell<Option<BodyList>> = const { RefCell::new(None) };
}

/// Records every tensor body allocated while one of its scopes is active.
#[derive(Debug, Default)]
pub struct ArrayBodyLeakTracker {
    bodies: BodyList,
}

impl ArrayBodyLeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates this tracker on the current thread until the returned guard is dropped.
    ///
    /// Whatever tracker was active before is restored on drop, including when the guarded
    /// code returns early with an error.
    pub fn scope(&self) -> LeakDetectionScope<'_> {
        let previous = ACTIVE_TRACKER.with(|active| {
            active.borrow_mut().replace(Rc::clone(&self.bodies))
        });
        trace!("leak detection scope entered");
        LeakDetectionScope {
            previous,
            _tracker: PhantomData,
        }
    }

    /// Number of bodies recorded so far (alive or not).
    pub fn num_tracked(&self) -> usize {
        self.bodies.borrow().len()
    }

    /// Returns `true` if every recorded body has been released.
    pub fn is_all_freed(&self) -> bool {
        self.bodies
            .borrow()
            .iter()
            .all(|body| body.strong_count() == 0)
    }

    /// Human-readable description of the surviving bodies, or `None` if there are none.
    pub fn leak_report(&self) -> Option<String> {
        let alive: Vec<Arc<RwLock<TensorData>>> = self
            .bodies
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        if alive.is_empty() {
            return None;
        }

        let mut report = String::new();
        let _ = writeln!(report, "Some array bodies are not freed.");
        let _ = writeln!(report, "Number of alive array bodies: {}", alive.len());
        for body in &alive {
            // One strong reference is the `Arc` we just upgraded.
            let refs = Arc::strong_count(body) - 1;
            match body.read() {
                Ok(guard) => {
                    let mut graphs: Vec<&str> = guard.nodes.keys().map(|g| g.name()).collect();
                    graphs.sort_unstable();
                    let _ = writeln!(
                        report,
                        "- shape={}, dtype={}, requires_grad_on={:?}, references={}",
                        format_shape(&guard.shape),
                        guard.dtype,
                        graphs,
                        refs
                    );
                }
                Err(_) => {
                    let _ = writeln!(report, "- <poisoned body>, references={}", refs);
                }
            }
        }
        Some(report)
    }
}

/// RAII guard returned by [`ArrayBodyLeakTracker::scope`].
pub struct LeakDetectionScope<'a> {
    previous: Option<BodyList>,
    _tracker: PhantomData<&'a ArrayBodyLeakTracker>,
}

impl Drop for LeakDetectionScope<'_> {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_TRACKER.with(|active| *active.borrow_mut() = previous);
        trace!("leak detection scope exited");
    }
}

/// Records a newly created body with the tracker active on this thread, if any.
pub(crate) fn register_body(body: &Arc<RwLock<TensorData>>) {
    ACTIVE_TRACKER.with(|active| {
        if let Some(bodies) = active.borrow().as_ref() {
            bodies.borrow_mut().push(Arc::downgrade(body));
        }
    });
}

#[cfg(test)]
#[path = "leak_tracker_test.rs"]
mod tests;
