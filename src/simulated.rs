//! Configurable stand-in units for the demo host and for exercising plans.

use crate::config::UnitConfig;
use crate::error::{unit_error, UnitError};
use crate::initializer::{
    Direction, ManagedInitializer, UnitDeclaration, UnitHandler, UnitId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A [`ManagedInitializer`] driven by a [`SimulatedHandler`]
pub type SimulatedUnit = ManagedInitializer<SimulatedHandler>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulatedError {
    #[error("Simulated {direction} failure in '{unit}'")]
    Injected { unit: UnitId, direction: Direction },

    #[error("'{unit}' interrupted during {direction}")]
    Interrupted { unit: UnitId, direction: Direction },
}

/// Something a simulated unit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Began(UnitId, Direction),
    Finished(UnitId, Direction),
}

/// Shared record of simulated unit activity
#[derive(Debug, Default)]
pub struct ActivityJournal {
    entries: Mutex<Vec<Activity>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityJournal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn began(&self, unit: &UnitId, direction: Direction) {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        self.entries
            .lock()
            .push(Activity::Began(unit.clone(), direction));
    }

    fn finished(&self, unit: &UnitId, direction: Direction) {
        self.entries
            .lock()
            .push(Activity::Finished(unit.clone(), direction));
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<Activity> {
        self.entries.lock().clone()
    }

    /// Highest number of units that were active at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn position(&self, activity: &Activity) -> Option<usize> {
        self.entries.lock().iter().position(|entry| entry == activity)
    }

    /// Units that finished `direction`, in completion order
    pub fn finished_units(&self, direction: Direction) -> Vec<UnitId> {
        self.entries
            .lock()
            .iter()
            .filter_map(|entry| match entry {
                Activity::Finished(unit, d) if *d == direction => Some(unit.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Handler that waits for a configured delay and may fail on purpose
#[derive(Debug, Clone)]
pub struct SimulatedHandler {
    id: UnitId,
    start_delay: Duration,
    stop_delay: Duration,
    fail_on_start: bool,
    fail_on_stop: bool,
    journal: Option<Arc<ActivityJournal>>,
}

impl SimulatedHandler {
    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            start_delay: Duration::ZERO,
            stop_delay: Duration::ZERO,
            fail_on_start: false,
            fail_on_stop: false,
            journal: None,
        }
    }

    pub fn with_delays(mut self, start_delay: Duration, stop_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self.stop_delay = stop_delay;
        self
    }

    pub fn failing(mut self, on_start: bool, on_stop: bool) -> Self {
        self.fail_on_start = on_start;
        self.fail_on_stop = on_stop;
        self
    }

    pub fn with_journal(mut self, journal: Arc<ActivityJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    async fn simulate(
        &self,
        direction: Direction,
        delay: Duration,
        fail: bool,
        cancel: &CancellationToken,
    ) -> Result<(), UnitError> {
        if let Some(journal) = &self.journal {
            journal.began(&self.id, direction);
        }

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = cancel.cancelled() => true,
        };

        if let Some(journal) = &self.journal {
            journal.finished(&self.id, direction);
        }

        if interrupted {
            return Err(unit_error(SimulatedError::Interrupted {
                unit: self.id.clone(),
                direction,
            }));
        }
        if fail {
            return Err(unit_error(SimulatedError::Injected {
                unit: self.id.clone(),
                direction,
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitHandler for SimulatedHandler {
    async fn on_start(&self, cancel: &CancellationToken) -> Result<(), UnitError> {
        info!("Starting {}", self.id);
        self.simulate(Direction::Startup, self.start_delay, self.fail_on_start, cancel)
            .await?;
        info!("Started {}", self.id);
        Ok(())
    }

    async fn on_stop(&self, cancel: &CancellationToken) -> Result<(), UnitError> {
        info!("Stopping {}", self.id);
        self.simulate(Direction::Shutdown, self.stop_delay, self.fail_on_stop, cancel)
            .await?;
        info!("Stopped {}", self.id);
        Ok(())
    }
}

impl ManagedInitializer<SimulatedHandler> {
    /// Unit that completes immediately in both directions
    pub fn instant(declaration: UnitDeclaration) -> Self {
        let handler = SimulatedHandler::new(declaration.id().clone());
        Self::new(declaration, handler)
    }

    /// Unit that records its activity into `journal`
    pub fn journaled(
        declaration: UnitDeclaration,
        delay: Duration,
        journal: Arc<ActivityJournal>,
    ) -> Self {
        let handler = SimulatedHandler::new(declaration.id().clone())
            .with_delays(delay, delay)
            .with_journal(journal);
        Self::new(declaration, handler)
    }

    /// Unit described by a `[[units]]` configuration entry
    pub fn from_config(config: &UnitConfig) -> Self {
        let handler = SimulatedHandler::new(config.declaration().id().clone())
            .with_delays(
                Duration::from_millis(config.start_delay_ms),
                Duration::from_millis(config.stop_delay_ms),
            )
            .failing(config.fail_on_start, config.fail_on_stop);
        Self::new(config.declaration(), handler)
    }
}
