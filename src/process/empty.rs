use super::{Process, ProcessShape};
use crate::error::ProcessError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

static SHARED: Lazy<Arc<dyn Process>> = Lazy::new(|| Arc::new(EmptyProcess));

/// Plan step with nothing to do
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProcess;

impl EmptyProcess {
    /// The process-wide instance
    pub fn shared() -> Arc<dyn Process> {
        Arc::clone(&SHARED)
    }
}

#[async_trait]
impl Process for EmptyProcess {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        Ok(())
    }

    fn shape(&self) -> ProcessShape {
        ProcessShape::Empty
    }
}
