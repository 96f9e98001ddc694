use super::{CompositeProcess, Process, ProcessShape};
use crate::error::ProcessError;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs its children concurrently on the runtime's worker pool
///
/// Every child is spawned before any is awaited. The group completes once all
/// children have completed and reports every failure, not only the first.
#[derive(Clone, Default)]
pub struct ParallelProcess {
    children: Vec<Arc<dyn Process>>,
}

impl ParallelProcess {
    pub fn new(children: Vec<Arc<dyn Process>>) -> Self {
        Self { children }
    }

    pub fn push(&mut self, process: Arc<dyn Process>) {
        self.children.push(process);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Process>> {
        self.children.iter()
    }
}

#[async_trait]
impl Process for ParallelProcess {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        debug!("Spawning {} parallel steps", self.children.len());
        let handles: Vec<_> = self
            .children
            .iter()
            .map(|child| {
                let child = Arc::clone(child);
                let cancel = cancel.clone();
                tokio::spawn(async move { child.run(&cancel).await })
            })
            .collect();

        let mut failures = Vec::new();
        for outcome in join_all(handles).await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => failures.push(error),
                Err(join_error) => failures.push(ProcessError::Panicked(join_error.to_string())),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProcessError::Aggregate(failures))
        }
    }

    fn shape(&self) -> ProcessShape {
        ProcessShape::Parallel(self.children.iter().map(|child| child.shape()).collect())
    }

    fn as_composite(&self) -> Option<&dyn CompositeProcess> {
        Some(self)
    }
}

impl CompositeProcess for ParallelProcess {
    fn children(&self) -> &[Arc<dyn Process>] {
        &self.children
    }

    fn rebuild(&self, children: Vec<Arc<dyn Process>>) -> Arc<dyn Process> {
        Arc::new(ParallelProcess::new(children))
    }
}
