use super::{Initializer, Placement, UnitId};
use crate::process::SingleProcess;
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Selects which half of a unit's declaration a plan is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Startup,
    Shutdown,
}

impl Direction {
    pub fn placement(self, unit: &dyn Initializer) -> Placement {
        match self {
            Direction::Startup => unit.declaration().start_placement(),
            Direction::Shutdown => unit.declaration().stop_placement(),
        }
    }

    pub fn dependencies(self, unit: &dyn Initializer) -> &[UnitId] {
        match self {
            Direction::Startup => unit.declaration().start_after(),
            Direction::Shutdown => unit.declaration().stop_after(),
        }
    }

    /// Bind the unit's start or stop action into a plan step
    pub fn as_single_process(self, unit: &Arc<dyn Initializer>) -> SingleProcess {
        let label = unit.id().to_string();
        let unit = Arc::clone(unit);

        match self {
            Direction::Startup => SingleProcess::new(label, move |cancel: CancellationToken| {
                let unit = Arc::clone(&unit);
                async move { unit.start(&cancel).await }.boxed()
            }),
            Direction::Shutdown => SingleProcess::new(label, move |cancel: CancellationToken| {
                let unit = Arc::clone(&unit);
                async move { unit.stop(&cancel).await }.boxed()
            }),
        }
    }

    /// Field name used when reporting placement problems
    pub fn placement_field(self) -> &'static str {
        match self {
            Direction::Startup => "start_placement",
            Direction::Shutdown => "stop_placement",
        }
    }

    /// Field name used when reporting dependency problems
    pub fn dependencies_field(self) -> &'static str {
        match self {
            Direction::Startup => "start_after",
            Direction::Shutdown => "stop_after",
        }
    }

    /// Noun used in validation messages
    pub fn sequence_name(self) -> &'static str {
        match self {
            Direction::Startup => "startup",
            Direction::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sequence_name())
    }
}
