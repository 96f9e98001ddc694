//! Executable plan nodes and the machinery that builds them.
//!
//! A plan is a tree of [`Process`] values:
//! ```text
//! Empty       - succeeds immediately
//! Single      - one unit action
//! Sequential  - children in order, stops at the first failure
//! Parallel    - children concurrently, joins all, aggregates failures
//! ```
//! Trees are immutable once built and are shared through `Arc` so the same plan
//! can be run by every transition.

mod constructor;
mod empty;
mod optimizer;
mod parallel;
mod sequential;
mod shape;
mod single;


pub use constructor::{DefaultProcessConstructor, ProcessConstructor};
pub use empty::EmptyProcess;
pub use optimizer::{DefaultProcessOptimizer, ProcessOptimizer};
pub use parallel::ParallelProcess;
pub use sequential::SequentialProcess;
pub use shape::ProcessShape;
pub use single::{ProcessAction, SingleProcess};

use crate::error::ProcessError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A composable, asynchronously executable plan step
#[async_trait]
pub trait Process: Send + Sync + 'static {
    /// Run the step to completion
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError>;

    /// Structural description of this step and its children
    fn shape(&self) -> ProcessShape;

    /// Access to the children when this step is a group
    fn as_composite(&self) -> Option<&dyn CompositeProcess> {
        None
    }
}

/// A plan step that groups other steps
pub trait CompositeProcess: Process {
    fn children(&self) -> &[Arc<dyn Process>];

    /// Build a group of the same kind holding `children`
    fn rebuild(&self, children: Vec<Arc<dyn Process>>) -> Arc<dyn Process>;
}
