use std::fmt;
use std::sync::Arc;

/// Name of the graph used when no graph identity is given explicitly.
pub const DEFAULT_GRAPH_NAME: &str = "default";

/// Opaque token partitioning gradient tracking into independent contexts.
///
/// A tensor keeps one gradient-tracking record per `GraphId` it participates in.
/// Two ids are the same graph iff their names are equal; cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(Arc<str>);

impl GraphId {
    pub fn new(name: &str) -> Self {
        GraphId(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        GraphId::new(DEFAULT_GRAPH_NAME)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({:?})", &*self.0)
    }
}
