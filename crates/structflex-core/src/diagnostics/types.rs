//! Core diagnostic types

use crate::error::Severity;
use crate::model::Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// The top-level source was nil or a typed nil
    NilSource,
    /// The top-level target was nil or not a reference
    NilOrNonReferenceTarget,
    /// A source value claims a kind but lacks the matching shape
    SourceNotConvertible,
    /// A target value claims a kind but lacks the matching shape
    TargetNotConvertible,
    /// The coercion matrix rejects the pair
    IncompatibleTypes,
    /// A keyed block has no map-block key field
    NoMapBlockKey,
    /// A custom hook produced no value
    HookReturnedNil,
    /// A custom hook produced a value the target cannot hold
    HookResultNotAssignable,
    /// Reported by a custom hook
    Custom,
}

impl DiagnosticCode {
    /// Short human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Self::NilSource => "Nil source",
            Self::NilOrNonReferenceTarget => "Nil or non-reference target",
            Self::SourceNotConvertible => "Source not convertible",
            Self::TargetNotConvertible => "Target not convertible",
            Self::IncompatibleTypes => "Incompatible types",
            Self::NoMapBlockKey => "No map block key",
            Self::HookReturnedNil => "Hook returned nil",
            Self::HookResultNotAssignable => "Hook result not assignable",
            Self::Custom => "Custom",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single conversion problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// Location in the source graph
    pub path: Path,
    /// Location in the target graph
    pub target_path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            path: Path::root(),
            target_path: Path::root(),
            source_type: None,
            target_type: None,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Attach source and target locations
    pub fn at(mut self, path: Path, target_path: Path) -> Self {
        self.path = path;
        self.target_path = target_path;
        self
    }

    /// Attach the source and target type names
    pub fn with_types(mut self, source: impl fmt::Display, target: impl fmt::Display) -> Self {
        self.source_type = Some(source.to_string());
        self.target_type = Some(target.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.code.title())?;
        if !self.path.is_root() {
            write!(f, " at {}", self.path)?;
        }
        write!(f, ": {}", self.message)
    }
}
