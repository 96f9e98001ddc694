use crate::initializer::{Direction, Initializer, Placement, UnitId};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One contradiction found in a set of declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Ordered list of validation problems; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.errors.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors reported against `field`
    pub fn count_for(&self, field: &str) -> usize {
        self.errors.iter().filter(|issue| issue.field == field).count()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} - {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

/// Checks a unit set for contradictory ordering declarations
pub trait InitializersValidator: Send + Sync {
    fn validate(&self, units: &[Arc<dyn Initializer>]) -> ValidationReport;
}

/// Placement and dependency rules applied to both directions
///
/// Dependency cycles inside the Beginning or Ending phase are not detected
/// here; the plan constructor refuses to build them instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInitializersValidator;

impl DefaultInitializersValidator {
    fn validate_direction(
        units: &[Arc<dyn Initializer>],
        direction: Direction,
        report: &mut ValidationReport,
    ) {
        let placed = |placement: Placement| -> Vec<&Arc<dyn Initializer>> {
            units
                .iter()
                .filter(|unit| direction.placement(unit.as_ref()) == placement)
                .collect()
        };
        let firsts = placed(Placement::First);
        let lasts = placed(Placement::Last);
        let sequence = direction.sequence_name();

        if firsts.len() > 1 {
            report.add_error(
                direction.placement_field(),
                format!(
                    "More than one initializer defined as first to run in the {} sequence.",
                    sequence
                ),
            );
        }

        if lasts.len() > 1 {
            report.add_error(
                direction.placement_field(),
                format!(
                    "More than one initializer defined as last to run in the {} sequence.",
                    sequence
                ),
            );
        }

        if let [first] = firsts.as_slice() {
            if !direction.dependencies(first.as_ref()).is_empty() {
                report.add_error(
                    direction.dependencies_field(),
                    format!(
                        "First initializer '{}' is declared to run after other initializers in the {} sequence.",
                        first.id(),
                        sequence
                    ),
                );
            }
        }

        if let [last] = lasts.as_slice() {
            let last_id = last.id();
            if units
                .iter()
                .any(|unit| direction.dependencies(unit.as_ref()).contains(last_id))
            {
                report.add_error(
                    direction.dependencies_field(),
                    format!(
                        "One or more initializers are declared to run after the last initializer '{}' in the {} sequence.",
                        last_id, sequence
                    ),
                );
            }
        }

        let ending: HashSet<&UnitId> = placed(Placement::Ending)
            .into_iter()
            .map(|unit| unit.id())
            .collect();
        let crosses_phase = placed(Placement::Beginning).into_iter().any(|unit| {
            direction
                .dependencies(unit.as_ref())
                .iter()
                .any(|dependency| ending.contains(dependency))
        });
        if crosses_phase {
            report.add_error(
                direction.dependencies_field(),
                format!(
                    "One or more beginning initializers are declared to run after ending initializers in the {} sequence.",
                    sequence
                ),
            );
        }
    }
}

impl InitializersValidator for DefaultInitializersValidator {
    fn validate(&self, units: &[Arc<dyn Initializer>]) -> ValidationReport {
        let mut report = ValidationReport::new();
        Self::validate_direction(units, Direction::Startup, &mut report);
        Self::validate_direction(units, Direction::Shutdown, &mut report);

        debug!(
            "Validated {} initializers: {} error(s)",
            units.len(),
            report.errors().len()
        );
        report
    }
}
