use super::{CompositeProcess, Process};
use std::sync::Arc;

/// Simplifies a built plan without changing how it executes
pub trait ProcessOptimizer: Send + Sync {
    fn optimize(&self, process: Arc<dyn Process>) -> Arc<dyn Process>;
}

/// Removes groups that wrap a single child
///
/// A group with one child is replaced by that child. Groups with several
/// children keep their kind and have each child optimized. Leaves are returned
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessOptimizer;

impl DefaultProcessOptimizer {
    fn optimize_composite(&self, composite: &dyn CompositeProcess) -> Arc<dyn Process> {
        let children = composite.children();
        if let [only] = children {
            return self.optimize(Arc::clone(only));
        }

        let optimized = children
            .iter()
            .map(|child| self.optimize(Arc::clone(child)))
            .collect();
        composite.rebuild(optimized)
    }
}

impl ProcessOptimizer for DefaultProcessOptimizer {
    fn optimize(&self, process: Arc<dyn Process>) -> Arc<dyn Process> {
        let optimized = process
            .as_composite()
            .map(|composite| self.optimize_composite(composite));
        optimized.unwrap_or(process)
    }
}
