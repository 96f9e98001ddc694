use super::types::Transition;
use super::{Bootstrapper, BootstrapperState};
use crate::error::Result;
use crate::initializer::Direction;
use tokio_util::sync::CancellationToken;

const STARTUP: Transition = Transition {
    direction: Direction::Startup,
    from: BootstrapperState::Stopped,
    during: BootstrapperState::Starting,
    to: BootstrapperState::Started,
};

impl Bootstrapper {
    /// Start every initializer according to the startup plan
    ///
    /// Only legal while `Stopped`. Returns `Ok(false)` when an initializer
    /// failed (the bootstrapper is then `Faulted`) or when `cancel` was already
    /// triggered; failures are logged, not returned.
    pub async fn begin_startup(&self, cancel: &CancellationToken) -> Result<bool> {
        self.transition(STARTUP, cancel).await
    }
}
