//! Registration of initializers and construction of a [`Bootstrapper`].

use crate::app::{Bootstrapper, DEFAULT_ADDITIONAL_TIME, DEFAULT_EVENT_CAPACITY};
use crate::error::{BootstrapError, Result};
use crate::initializer::{Initializer, UnitId};
use crate::process::{DefaultProcessConstructor, DefaultProcessOptimizer, ProcessConstructor};
use crate::validation::{DefaultInitializersValidator, InitializersValidator};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Supplies a group of initializers registered together
pub trait InitializerModule {
    fn initializers(&self) -> Vec<Arc<dyn Initializer>>;
}

/// Ordered set of initializers keyed by [`UnitId`]
#[derive(Default)]
pub struct InitializerRegistry {
    units: Vec<Arc<dyn Initializer>>,
    ids: HashSet<UnitId>,
}

impl InitializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit; a second unit with the same id is ignored
    pub fn add_initializer(&mut self, unit: Arc<dyn Initializer>) -> &mut Self {
        if self.ids.insert(unit.id().clone()) {
            debug!("Registered initializer '{}'", unit.id());
            self.units.push(unit);
        } else {
            warn!("Initializer '{}' is already registered, ignoring", unit.id());
        }
        self
    }

    pub fn add_initializers<I>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Initializer>>,
    {
        for unit in units {
            self.add_initializer(unit);
        }
        self
    }

    pub fn add_module<M: InitializerModule + ?Sized>(&mut self, module: &M) -> &mut Self {
        self.add_initializers(module.initializers())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn into_units(self) -> Vec<Arc<dyn Initializer>> {
        self.units
    }
}

/// Assembles a [`Bootstrapper`] from its collaborators
///
/// The unit set is required. Validator and constructor fall back to the
/// defaults when not supplied.
pub struct BootstrapperBuilder {
    registry: Option<InitializerRegistry>,
    validator: Option<Arc<dyn InitializersValidator>>,
    constructor: Option<Arc<dyn ProcessConstructor>>,
    additional_time: Duration,
    event_capacity: usize,
}

impl BootstrapperBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            validator: None,
            constructor: None,
            additional_time: DEFAULT_ADDITIONAL_TIME,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Register units; may be called more than once
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut InitializerRegistry),
    {
        configure(self.registry.get_or_insert_with(InitializerRegistry::new));
        self
    }

    pub fn validator(mut self, validator: Arc<dyn InitializersValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn constructor(mut self, constructor: Arc<dyn ProcessConstructor>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn additional_time(mut self, additional_time: Duration) -> Self {
        self.additional_time = additional_time;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Validate the registered units and create the bootstrapper
    pub fn build(self) -> Result<Bootstrapper> {
        let registry = self
            .registry
            .ok_or(BootstrapError::MissingCollaborator("initializers"))?;

        let validator = self.validator.unwrap_or_else(|| {
            Arc::new(DefaultInitializersValidator) as Arc<dyn InitializersValidator>
        });
        let constructor = self.constructor.unwrap_or_else(|| {
            Arc::new(DefaultProcessConstructor::new(
                Arc::clone(&validator),
                Arc::new(DefaultProcessOptimizer),
            )) as Arc<dyn ProcessConstructor>
        });

        let units = registry.into_units();
        let report = validator.validate(&units);
        if !report.is_valid() {
            return Err(BootstrapError::Validation(report));
        }

        info!("Bootstrapper created with {} initializers", units.len());
        Ok(Bootstrapper::new(
            units,
            constructor,
            self.additional_time,
            self.event_capacity,
        ))
    }
}

impl Default for BootstrapperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
