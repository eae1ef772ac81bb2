//! Error types for the structflex core library
//!
//! Conversion itself never fails with an `Err`: problems found while walking a
//! value graph are collected as [`Diagnostic`](crate::Diagnostic)s. The errors
//! defined here cover misuse detected while building types, field hints and
//! options, before any conversion begins.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for structflex construction-time failures
#[derive(Error, Debug)]
pub enum Error {
    /// A per-field hint string could not be parsed
    #[error("Invalid hint {hint:?} on field {field}: {message}")]
    InvalidHint {
        field: String,
        hint: String,
        message: String,
    },

    /// An option value was rejected by validation
    #[error("Invalid option {option}: {message}")]
    InvalidOption { option: String, message: String },

    /// Two fields of one record type share a name
    #[error("Duplicate field {field} in type {type_name}")]
    DuplicateField { type_name: String, field: String },

    /// A value was built with a field its type does not declare
    #[error("Type {type_name} has no field named {field}")]
    UnknownField { type_name: String, field: String },

    /// JSON parsing errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result type alias for structflex operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid option error
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Create an invalid hint error
    pub fn invalid_hint(
        field: impl Into<String>,
        hint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidHint {
            field: field.into(),
            hint: hint.into(),
            message: message.into(),
        }
    }
}

/// Severity of a conversion diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; the target is still trustworthy
    Warning,
    /// The affected field was left at its zero value
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}
