use super::types::BootstrapperState;
use crate::error::Result;
use crate::events::{BootstrapperEvent, EventBus};
use crate::initializer::Initializer;
use crate::process::{Process, ProcessConstructor};
use crate::registry::BootstrapperBuilder;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Default grace period requested from the host while a transition runs
pub const DEFAULT_ADDITIONAL_TIME: Duration = Duration::from_secs(5);

/// Signals buffered per subscriber before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Coordinates the startup and shutdown of a fixed set of initializers
///
/// Plans are built on first use and reused afterwards. Only one transition
/// runs at a time; a second caller is refused rather than queued.
pub struct Bootstrapper {
    pub(super) units: Vec<Arc<dyn Initializer>>,
    pub(super) constructor: Arc<dyn ProcessConstructor>,

    // Plans
    pub(super) startup_plan: OnceCell<Arc<dyn Process>>,
    pub(super) shutdown_plan: OnceCell<Arc<dyn Process>>,

    // Lifecycle management
    pub(super) state: RwLock<BootstrapperState>,
    pub(super) additional_time: RwLock<Duration>,
    pub(super) transition_lock: Mutex<()>,
    pub(super) event_bus: EventBus,
}

impl Bootstrapper {
    pub(crate) fn new(
        units: Vec<Arc<dyn Initializer>>,
        constructor: Arc<dyn ProcessConstructor>,
        additional_time: Duration,
        event_capacity: usize,
    ) -> Self {
        Self {
            units,
            constructor,
            startup_plan: OnceCell::new(),
            shutdown_plan: OnceCell::new(),
            state: RwLock::new(BootstrapperState::Stopped),
            additional_time: RwLock::new(additional_time),
            transition_lock: Mutex::new(()),
            event_bus: EventBus::new(event_capacity),
        }
    }

    pub fn builder() -> BootstrapperBuilder {
        BootstrapperBuilder::new()
    }

    /// Registered units in registration order
    pub fn units(&self) -> &[Arc<dyn Initializer>] {
        &self.units
    }

    /// Duration announced by each additional-time request
    pub fn additional_time(&self) -> Duration {
        *self.additional_time.read()
    }

    /// Change the announced duration; takes effect on the next transition
    pub fn set_additional_time(&self, additional_time: Duration) {
        *self.additional_time.write() = additional_time;
    }

    /// Receive state changes and additional-time requests
    pub fn subscribe(&self) -> broadcast::Receiver<BootstrapperEvent> {
        self.event_bus.subscribe()
    }

    /// The startup plan, built on first access
    pub fn startup_process(&self) -> Result<Arc<dyn Process>> {
        self.startup_plan
            .get_or_try_init(|| self.constructor.build_startup_process(&self.units))
            .map(Arc::clone)
    }

    /// The shutdown plan, built on first access
    pub fn shutdown_process(&self) -> Result<Arc<dyn Process>> {
        self.shutdown_plan
            .get_or_try_init(|| self.constructor.build_shutdown_process(&self.units))
            .map(Arc::clone)
    }
}
