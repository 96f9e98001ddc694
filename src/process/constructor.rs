use super::{
    DefaultProcessOptimizer, EmptyProcess, ParallelProcess, Process, ProcessOptimizer,
    SequentialProcess,
};
use crate::error::{BootstrapError, Result};
use crate::initializer::{Direction, Initializer, Placement, UnitId};
use crate::validation::{DefaultInitializersValidator, InitializersValidator};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Turns a unit set into startup and shutdown plans
pub trait ProcessConstructor: Send + Sync {
    fn build_startup_process(&self, units: &[Arc<dyn Initializer>]) -> Result<Arc<dyn Process>>;

    fn build_shutdown_process(&self, units: &[Arc<dyn Initializer>])
        -> Result<Arc<dyn Process>>;
}

/// Builds leveled plans from placements and dependencies
///
/// ```text
/// Sequential[ First ] -> [ Beginning waves ] -> [ Ending waves ] -> [ Last ]
/// ```
/// Within a phase, units with no dependency on another member of the phase
/// run as one parallel wave; the remaining units are scheduled the same way
/// after that wave completes.
pub struct DefaultProcessConstructor {
    validator: Arc<dyn InitializersValidator>,
    optimizer: Arc<dyn ProcessOptimizer>,
}

impl DefaultProcessConstructor {
    pub fn new(
        validator: Arc<dyn InitializersValidator>,
        optimizer: Arc<dyn ProcessOptimizer>,
    ) -> Self {
        Self {
            validator,
            optimizer,
        }
    }

    fn build_process(
        &self,
        units: &[Arc<dyn Initializer>],
        direction: Direction,
    ) -> Result<Arc<dyn Process>> {
        let report = self.validator.validate(units);
        if !report.is_valid() {
            return Err(BootstrapError::Validation(report));
        }

        let process: Arc<dyn Process> = match units {
            [] => EmptyProcess::shared(),
            [only] => Arc::new(direction.as_single_process(only)),
            _ => self.build_complex_process(units, direction)?,
        };

        debug!("Built {} plan: {}", direction, process.shape());
        Ok(process)
    }

    fn build_complex_process(
        &self,
        units: &[Arc<dyn Initializer>],
        direction: Direction,
    ) -> Result<Arc<dyn Process>> {
        let placed = |placement: Placement| -> Vec<Arc<dyn Initializer>> {
            units
                .iter()
                .filter(|unit| direction.placement(unit.as_ref()) == placement)
                .cloned()
                .collect()
        };

        let first = placed(Placement::First).into_iter().next();
        let last = placed(Placement::Last).into_iter().next();
        let beginning = placed(Placement::Beginning);
        let ending = placed(Placement::Ending);

        let mut root = SequentialProcess::default();

        if let Some(first) = first {
            root.push(Arc::new(direction.as_single_process(&first)));
        }

        if let Some(sequence) = build_sequence(&beginning, direction)? {
            root.push(sequence);
        }

        if let Some(sequence) = build_sequence(&ending, direction)? {
            root.push(sequence);
        }

        if let Some(last) = last {
            root.push(Arc::new(direction.as_single_process(&last)));
        }

        Ok(self.optimizer.optimize(Arc::new(root)))
    }
}

impl Default for DefaultProcessConstructor {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultInitializersValidator),
            Arc::new(DefaultProcessOptimizer),
        )
    }
}

impl ProcessConstructor for DefaultProcessConstructor {
    fn build_startup_process(&self, units: &[Arc<dyn Initializer>]) -> Result<Arc<dyn Process>> {
        self.build_process(units, Direction::Startup)
    }

    fn build_shutdown_process(
        &self,
        units: &[Arc<dyn Initializer>],
    ) -> Result<Arc<dyn Process>> {
        self.build_process(units, Direction::Shutdown)
    }
}

/// Schedule one phase as consecutive parallel waves
fn build_sequence(
    units: &[Arc<dyn Initializer>],
    direction: Direction,
) -> Result<Option<Arc<dyn Process>>> {
    match units {
        [] => return Ok(None),
        [only] => return Ok(Some(Arc::new(direction.as_single_process(only)))),
        _ => {}
    }

    let present: HashSet<&UnitId> = units.iter().map(|unit| unit.id()).collect();
    let (dependent, independent): (Vec<_>, Vec<_>) = units.iter().cloned().partition(|unit| {
        direction
            .dependencies(unit.as_ref())
            .iter()
            .any(|dependency| present.contains(dependency))
    });

    // Nothing can run first, so the remaining units wait on each other
    if independent.is_empty() {
        return Err(BootstrapError::CyclicDependency {
            units: dependent.iter().map(|unit| unit.id().clone()).collect(),
        });
    }

    let wave: Vec<Arc<dyn Process>> = independent
        .iter()
        .map(|unit| Arc::new(direction.as_single_process(unit)) as Arc<dyn Process>)
        .collect();

    let mut sequence = SequentialProcess::default();
    sequence.push(Arc::new(ParallelProcess::new(wave)));

    if let Some(next) = build_sequence(&dependent, direction)? {
        sequence.push(next);
    }

    Ok(Some(Arc::new(sequence)))
}
