use super::{Initializer, UnitDeclaration};
use crate::error::{unit_error, UnitError, UnitStateError};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// User supplied behaviour wrapped by [`ManagedInitializer`]
#[async_trait]
pub trait UnitHandler: Send + Sync + 'static {
    async fn on_start(&self, cancel: &CancellationToken) -> Result<(), UnitError>;

    async fn on_stop(&self, cancel: &CancellationToken) -> Result<(), UnitError>;
}

/// Observable lifecycle phase of a single unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPhase {
    Idle,
    Starting,
    Started,
    Stopping,
}

#[derive(Debug, Default)]
struct PhaseFlags {
    starting: bool,
    started: bool,
    stopping: bool,
}

impl PhaseFlags {
    fn check_start(&self) -> Result<(), UnitStateError> {
        if self.starting {
            return Err(UnitStateError::AlreadyStarting);
        }
        if self.started {
            return Err(UnitStateError::AlreadyStarted);
        }
        Ok(())
    }

    fn check_stop(&self) -> Result<(), UnitStateError> {
        if !self.started && !self.starting {
            return Err(UnitStateError::NotStarted);
        }
        if self.stopping {
            return Err(UnitStateError::AlreadyStopping);
        }
        Ok(())
    }
}

/// Clears the in-flight flag when a handler call ends, even if its future is dropped
struct InFlight<'a> {
    flags: &'a Mutex<PhaseFlags>,
    stopping: bool,
    succeeded: bool,
}

impl<'a> InFlight<'a> {
    fn starting(flags: &'a Mutex<PhaseFlags>) -> Self {
        Self {
            flags,
            stopping: false,
            succeeded: false,
        }
    }

    fn stopping(flags: &'a Mutex<PhaseFlags>) -> Self {
        Self {
            flags,
            stopping: true,
            succeeded: false,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut flags = self.flags.lock();
        if self.stopping {
            flags.stopping = false;
            if self.succeeded {
                flags.started = false;
            }
        } else {
            flags.starting = false;
            if self.succeeded {
                flags.started = true;
            }
        }
    }
}

/// Initializer base that guards its handler against out of order calls
///
/// Starting while starting or started fails, and so does stopping a unit that
/// is neither started nor starting, or that is already stopping. The started
/// flag only changes when the handler succeeds.
pub struct ManagedInitializer<H> {
    declaration: UnitDeclaration,
    handler: H,
    flags: Mutex<PhaseFlags>,
}

impl<H: UnitHandler> ManagedInitializer<H> {
    pub fn new(declaration: UnitDeclaration, handler: H) -> Self {
        Self {
            declaration,
            handler,
            flags: Mutex::new(PhaseFlags::default()),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn phase(&self) -> UnitPhase {
        let flags = self.flags.lock();
        if flags.stopping {
            UnitPhase::Stopping
        } else if flags.starting {
            UnitPhase::Starting
        } else if flags.started {
            UnitPhase::Started
        } else {
            UnitPhase::Idle
        }
    }

    pub fn is_started(&self) -> bool {
        self.flags.lock().started
    }
}

#[async_trait]
impl<H: UnitHandler> Initializer for ManagedInitializer<H> {
    fn declaration(&self) -> &UnitDeclaration {
        &self.declaration
    }

    async fn start(&self, cancel: &CancellationToken) -> Result<(), UnitError> {
        {
            let mut flags = self.flags.lock();
            flags.check_start().map_err(unit_error)?;
            flags.starting = true;
        }

        let mut in_flight = InFlight::starting(&self.flags);

        debug!("Starting initializer '{}'", self.declaration.id());
        let result = self.handler.on_start(cancel).await;

        in_flight.succeeded = result.is_ok();
        drop(in_flight);
        if result.is_ok() {
            debug!("Initializer '{}' started", self.declaration.id());
        }
        result
    }

    async fn stop(&self, cancel: &CancellationToken) -> Result<(), UnitError> {
        {
            let mut flags = self.flags.lock();
            flags.check_stop().map_err(unit_error)?;
            flags.stopping = true;
        }

        let mut in_flight = InFlight::stopping(&self.flags);

        debug!("Stopping initializer '{}'", self.declaration.id());
        let result = self.handler.on_stop(cancel).await;

        in_flight.succeeded = result.is_ok();
        drop(in_flight);
        if result.is_ok() {
            debug!("Initializer '{}' stopped", self.declaration.id());
        }
        result
    }
}
