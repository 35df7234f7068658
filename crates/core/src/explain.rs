//! Score explanations
//!
//! An `Explanation` is a tree: a value, a human readable description, and
//! the sub-explanations the value was computed from. Models build one from
//! the per-feature explanations of a document.

use serde::Serialize;
use std::fmt;

/// Explanation of how a value was computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// The explained value
    pub value: f32,
    /// What the value is
    pub description: String,
    /// Values this one was computed from
    pub details: Vec<Explanation>,
}

impl Explanation {
    /// A leaf explanation
    pub fn new(value: f32, description: impl Into<String>) -> Self {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// An explanation with sub-explanations
    pub fn with_details(
        value: f32,
        description: impl Into<String>,
        details: Vec<Explanation>,
    ) -> Self {
        Explanation {
            value,
            description: description.into(),
            details,
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        writeln!(f, "{:?} = {}", self.value, self.description)?;
        for detail in &self.details {
            detail.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
