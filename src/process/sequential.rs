use super::{CompositeProcess, Process, ProcessShape};
use crate::error::ProcessError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs its children one after another
///
/// The first failing child ends the run; later siblings never start and the
/// failure is returned unchanged.
#[derive(Clone, Default)]
pub struct SequentialProcess {
    children: Vec<Arc<dyn Process>>,
}

impl SequentialProcess {
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
impl Process for SequentialProcess {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        for child in &self.children {
            if cancel.is_cancelled() {
                return Err(ProcessError::Cancelled);
            }
            child.run(cancel).await?;
        }
        Ok(())
    }

    fn shape(&self) -> ProcessShape {
        ProcessShape::Sequential(self.children.iter().map(|child| child.shape()).collect())
    }

    fn as_composite(&self) -> Option<&dyn CompositeProcess> {
        Some(self)
    }
}

impl CompositeProcess for SequentialProcess {
    fn children(&self) -> &[Arc<dyn Process>] {
        &self.children
    }

    fn rebuild(&self, children: Vec<Arc<dyn Process>>) -> Arc<dyn Process> {
        Arc::new(SequentialProcess::new(children))
    }
}
