use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of an initializer, used by other units to declare ordering
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Requested position of a unit within one direction's plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    /// Runs alone before everything else
    First,
    /// Runs alone after everything else
    Last,
    /// Early phase (default when starting)
    Beginning,
    /// Late phase (default when stopping)
    Ending,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Placement::First => "First",
            Placement::Last => "Last",
            Placement::Beginning => "Beginning",
            Placement::Ending => "Ending",
        };
        f.write_str(name)
    }
}

/// Static ordering declaration of a unit, fixed at registration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDeclaration {
    id: UnitId,
    start_placement: Placement,
    stop_placement: Placement,
    start_after: Vec<UnitId>,
    stop_after: Vec<UnitId>,
}

impl UnitDeclaration {
    /// Declaration with default placements and no dependencies
    pub fn new<I: Into<UnitId>>(id: I) -> Self {
        Self {
            id: id.into(),
            start_placement: Placement::Beginning,
            stop_placement: Placement::Ending,
            start_after: Vec::new(),
            stop_after: Vec::new(),
        }
    }

    pub fn builder<I: Into<UnitId>>(id: I) -> UnitDeclarationBuilder {
        UnitDeclarationBuilder {
            declaration: Self::new(id),
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn start_placement(&self) -> Placement {
        self.start_placement
    }

    pub fn stop_placement(&self) -> Placement {
        self.stop_placement
    }

    /// Units that must finish starting before this one starts
    pub fn start_after(&self) -> &[UnitId] {
        &self.start_after
    }

    /// Units that must finish stopping before this one stops
    pub fn stop_after(&self) -> &[UnitId] {
        &self.stop_after
    }
}

/// Builder for [`UnitDeclaration`]
#[derive(Debug, Clone)]
pub struct UnitDeclarationBuilder {
    declaration: UnitDeclaration,
}

impl UnitDeclarationBuilder {
    pub fn start_placement(mut self, placement: Placement) -> Self {
        self.declaration.start_placement = placement;
        self
    }

    pub fn stop_placement(mut self, placement: Placement) -> Self {
        self.declaration.stop_placement = placement;
        self
    }

    pub fn start_after<I: Into<UnitId>>(mut self, id: I) -> Self {
        push_unique(&mut self.declaration.start_after, id.into());
        self
    }

    pub fn stop_after<I: Into<UnitId>>(mut self, id: I) -> Self {
        push_unique(&mut self.declaration.stop_after, id.into());
        self
    }

    pub fn build(self) -> UnitDeclaration {
        self.declaration
    }
}

fn push_unique(ids: &mut Vec<UnitId>, id: UnitId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
