use crate::app::BootstrapperState;
use crate::initializer::{Direction, UnitId};
use crate::validation::ValidationReport;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by an initializer's start or stop action.
///
/// Failures are reference counted so that the exact value produced by a unit
/// travels unchanged through every plan node up to the controller.
pub type UnitError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wrap any error into a [`UnitError`]
pub fn unit_error<E>(error: E) -> UnitError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Arc::new(error)
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Initializer validation failed:\n{0}")]
    Validation(ValidationReport),

    #[error("Cyclic dependency detected between initializers: {}", format_units(.units))]
    CyclicDependency { units: Vec<UnitId> },

    #[error("Invalid bootstrapper state. Expected: {expected}, found: {found}")]
    InvalidState {
        expected: BootstrapperState,
        found: BootstrapperState,
    },

    #[error("Cannot begin {requested}, another transition is in progress")]
    TransitionInProgress { requested: Direction },

    #[error("Host {phase} failed, examine the logs for details")]
    Host { phase: &'static str },
}

impl BootstrapError {
    pub fn invalid_state(expected: BootstrapperState, found: BootstrapperState) -> Self {
        Self::InvalidState { expected, found }
    }

    /// Whether this error was raised by a transition guard rather than by the plan
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::TransitionInProgress { .. }
        )
    }
}

fn format_units(units: &[UnitId]) -> String {
    units
        .iter()
        .map(UnitId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a plan node that did not complete successfully
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// A single step failed; `source` is the value the unit returned
    #[error("step '{step}' failed: {source}")]
    Failed { step: String, source: UnitError },

    /// One or more members of a parallel group failed
    #[error("{} parallel step(s) failed", .0.len())]
    Aggregate(Vec<ProcessError>),

    /// The step declined to run because cancellation was requested
    #[error("step was cancelled before it started")]
    Cancelled,

    /// A spawned step panicked or was aborted by the runtime
    #[error("step task terminated abnormally: {0}")]
    Panicked(String),
}

impl ProcessError {
    /// Flatten nested aggregates into their leaf failures
    pub fn flatten(&self) -> Vec<&ProcessError> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a ProcessError>) {
        match self {
            ProcessError::Aggregate(inner) => {
                for error in inner {
                    error.collect_leaves(leaves);
                }
            }
            leaf => leaves.push(leaf),
        }
    }

    /// The unit failure carried by a `Failed` leaf
    pub fn unit_error(&self) -> Option<&UnitError> {
        match self {
            ProcessError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when every leaf is a cancellation
    pub fn is_cancellation(&self) -> bool {
        self.flatten()
            .iter()
            .all(|leaf| matches!(leaf, ProcessError::Cancelled))
    }
}

/// Misuse of a single initializer's own lifecycle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStateError {
    #[error("Already starting.")]
    AlreadyStarting,

    #[error("Already started.")]
    AlreadyStarted,

    #[error("Not started.")]
    NotStarted,

    #[error("Already stopping.")]
    AlreadyStopping,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
