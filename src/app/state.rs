use super::{Bootstrapper, BootstrapperState};
use crate::error::{BootstrapError, Result};
use crate::events::BootstrapperEvent;
use std::time::Duration;
use tracing::{debug, info};

impl Bootstrapper {
    /// Current lifecycle state
    pub fn state(&self) -> BootstrapperState {
        *self.state.read()
    }

    /// Update the state, announcing it only when it actually changes
    pub(super) fn set_state(&self, state: BootstrapperState) {
        let previous = {
            let mut current = self.state.write();
            std::mem::replace(&mut *current, state)
        };

        if previous != state {
            info!("Bootstrapper state changed: {} -> {}", previous, state);
            self.event_bus
                .publish(BootstrapperEvent::StateChanged { state });
        }
    }

    pub(super) fn ensure_state(&self, expected: BootstrapperState) -> Result<()> {
        let found = self.state();
        if found != expected {
            return Err(BootstrapError::invalid_state(expected, found));
        }
        Ok(())
    }

    pub(super) fn request_additional_time(&self, duration: Duration) {
        debug!("Requesting {:?} of additional time", duration);
        self.event_bus
            .publish(BootstrapperEvent::AdditionalTimeRequested { duration });
    }
}
