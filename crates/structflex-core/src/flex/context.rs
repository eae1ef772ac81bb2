//! Per-call conversion context
//!
//! Tracks where the walk currently is on both sides, so every diagnostic and
//! trace event can name the source path and the target path.

use super::options::FlexOptions;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::model::Path;
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Lower (Tagged to Plain) or Lift (Plain to Tagged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Lower,
    Lift,
}

impl Direction {
    /// Verb used in messages
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Lower => "lowered",
            Direction::Lift => "lifted",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Lower => write!(f, "lower"),
            Direction::Lift => write!(f, "lift"),
        }
    }
}

/// Immutable view of the current position; children are derived, never mutated
#[derive(Debug, Clone)]
pub struct ConversionContext<'a> {
    direction: Direction,
    options: &'a FlexOptions,
    source_path: Path,
    target_path: Path,
    depth: usize,
}

impl<'a> ConversionContext<'a> {
    pub fn new(direction: Direction, options: &'a FlexOptions) -> Self {
        Self {
            direction,
            options,
            source_path: Path::root(),
            target_path: Path::root(),
            depth: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn options(&self) -> &'a FlexOptions {
        self.options
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn child(&self, source_path: Path, target_path: Path) -> Self {
        Self {
            direction: self.direction,
            options: self.options,
            source_path,
            target_path,
            depth: self.depth + 1,
        }
    }

    /// Matched record fields
    pub fn at_names(&self, source: &str, target: &str) -> Self {
        self.child(self.source_path.at_name(source), self.target_path.at_name(target))
    }

    /// Same element position on both sides
    pub fn at_list_index(&self, index: usize) -> Self {
        self.child(
            self.source_path.at_list_index(index),
            self.target_path.at_list_index(index),
        )
    }

    /// Same map key on both sides
    pub fn at_map_key(&self, key: &str) -> Self {
        self.child(self.source_path.at_map_key(key), self.target_path.at_map_key(key))
    }

    /// A source element that becomes a target map entry
    pub fn at_list_index_to_map_key(&self, index: usize, key: &str) -> Self {
        self.child(self.source_path.at_list_index(index), self.target_path.at_map_key(key))
    }

    /// A source map entry that becomes a target element
    pub fn at_map_key_to_list_index(&self, key: &str, index: usize) -> Self {
        self.child(self.source_path.at_map_key(key), self.target_path.at_list_index(index))
    }

    /// Only the source descends, e.g. the first element of a list into a record
    pub fn at_source_index(&self, index: usize) -> Self {
        self.child(self.source_path.at_list_index(index), self.target_path.clone())
    }

    /// Only the target descends, e.g. a record into a one-element list
    pub fn at_target_index(&self, index: usize) -> Self {
        self.child(self.source_path.clone(), self.target_path.at_list_index(index))
    }

    /// Only the target descends into a named field
    pub fn at_target_name(&self, name: &str) -> Self {
        self.child(self.source_path.clone(), self.target_path.at_name(name))
    }

    /// Only the source descends into a named field
    pub fn at_source_name(&self, name: &str) -> Self {
        self.child(self.source_path.at_name(name), self.target_path.clone())
    }

    /// Error diagnostic at the current position, logged as it is created
    pub fn diagnostic(&self, code: DiagnosticCode, message: impl Into<String>) -> Diagnostic {
        let diagnostic = Diagnostic::error(code, message)
            .at(self.source_path.clone(), self.target_path.clone());
        error!(
            source_path = %self.source_path,
            target_path = %self.target_path,
            code = %diagnostic.code,
            "{}",
            diagnostic.message
        );
        diagnostic
    }

    /// Error for a pair the coercion rules reject
    pub fn incompatible(
        &self,
        source_type: impl fmt::Display,
        target_type: impl fmt::Display,
    ) -> Diagnostic {
        let message = format!(
            "Source type {source_type} cannot be {} to target type {target_type}",
            self.direction.verb()
        );
        self.diagnostic(DiagnosticCode::IncompatibleTypes, message)
            .with_types(source_type, target_type)
    }
}
