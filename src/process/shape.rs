use serde::Serialize;
use std::fmt;

/// Structural view of a plan, used for inspection and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProcessShape {
    Empty,
    Single(String),
    Sequential(Vec<ProcessShape>),
    Parallel(Vec<ProcessShape>),
}

impl ProcessShape {
    pub fn single<S: Into<String>>(label: S) -> Self {
        ProcessShape::Single(label.into())
    }

    /// Number of single steps in the tree
    pub fn step_count(&self) -> usize {
        match self {
            ProcessShape::Empty => 0,
            ProcessShape::Single(_) => 1,
            ProcessShape::Sequential(children) | ProcessShape::Parallel(children) => {
                children.iter().map(ProcessShape::step_count).sum()
            }
        }
    }

    /// Nesting depth, where a leaf has depth one
    pub fn depth(&self) -> usize {
        match self {
            ProcessShape::Empty | ProcessShape::Single(_) => 1,
            ProcessShape::Sequential(children) | ProcessShape::Parallel(children) => {
                1 + children.iter().map(ProcessShape::depth).max().unwrap_or(0)
            }
        }
    }
}

impl fmt::Display for ProcessShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, children) = match self {
            ProcessShape::Empty => return f.write_str("Empty"),
            ProcessShape::Single(label) => return f.write_str(label),
            ProcessShape::Sequential(children) => ("Sequential", children),
            ProcessShape::Parallel(children) => ("Parallel", children),
        };

        write!(f, "{}(", name)?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}
