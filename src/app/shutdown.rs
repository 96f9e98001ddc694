use super::types::Transition;
use super::{Bootstrapper, BootstrapperState};
use crate::error::Result;
use crate::initializer::Direction;
use tokio_util::sync::CancellationToken;

const SHUTDOWN: Transition = Transition {
    direction: Direction::Shutdown,
    from: BootstrapperState::Started,
    during: BootstrapperState::Stopping,
    to: BootstrapperState::Stopped,
};

impl Bootstrapper {
    /// Stop every initializer according to the shutdown plan
    ///
    /// Only legal while `Started`.
    pub async fn begin_shutdown(&self, cancel: &CancellationToken) -> Result<bool> {
        self.transition(SHUTDOWN, cancel).await
    }
}
