use super::{Process, ProcessShape};
use crate::error::{ProcessError, UnitError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Asynchronous action wrapped by a [`SingleProcess`]
pub type ProcessAction =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), UnitError>> + Send + Sync>;

/// Plan step that runs exactly one action
#[derive(Clone)]
pub struct SingleProcess {
    label: String,
    action: ProcessAction,
}

impl SingleProcess {
    pub fn new<S, F>(label: S, action: F) -> Self
    where
        S: Into<String>,
        F: Fn(CancellationToken) -> BoxFuture<'static, Result<(), UnitError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            label: label.into(),
            action: Arc::new(action),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Process for SingleProcess {
    async fn run(&self, cancel: &CancellationToken) -> Result<(), ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        (self.action)(cancel.clone())
            .await
            .map_err(|source| ProcessError::Failed {
                step: self.label.clone(),
                source,
            })
    }

    fn shape(&self) -> ProcessShape {
        ProcessShape::Single(self.label.clone())
    }
}
