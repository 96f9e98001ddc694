use crate::initializer::Direction;
use serde::Serialize;
use std::fmt;

/// Bootstrapper lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BootstrapperState {
    Stopped,
    Starting,
    Started,
    Stopping,
    /// A transition failed; no further transitions are accepted
    Faulted,
}

impl BootstrapperState {
    pub fn is_transient(&self) -> bool {
        matches!(self, BootstrapperState::Starting | BootstrapperState::Stopping)
    }
}

impl fmt::Display for BootstrapperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapperState::Stopped => "Stopped",
            BootstrapperState::Starting => "Starting",
            BootstrapperState::Started => "Started",
            BootstrapperState::Stopping => "Stopping",
            BootstrapperState::Faulted => "Faulted",
        };
        f.write_str(name)
    }
}

/// The states one transition moves through
#[derive(Debug, Clone, Copy)]
pub(super) struct Transition {
    pub direction: Direction,
    pub from: BootstrapperState,
    pub during: BootstrapperState,
    pub to: BootstrapperState,
}
