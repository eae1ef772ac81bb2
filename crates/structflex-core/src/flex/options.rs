//! Conversion options
//!
//! Options are either built from [`FlexOption`] values, the functional form
//! used at call sites, or loaded from JSON/YAML text. Both routes end in
//! [`FlexOptions::validate`], so a bad prefix or ignore list is rejected
//! before any conversion begins.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Field names skipped on both sides unless the ignore set is replaced
pub const DEFAULT_IGNORED_FIELD_NAMES: &[&str] = &["Tags", "TagsAll"];

static DEFAULT_IGNORED: OnceLock<BTreeSet<String>> = OnceLock::new();
static IDENTIFIER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// The process-wide default ignore set
pub fn default_ignored_field_names() -> &'static BTreeSet<String> {
    DEFAULT_IGNORED.get_or_init(|| {
        DEFAULT_IGNORED_FIELD_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect()
    })
}

fn is_identifier(name: &str) -> bool {
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// A single functional option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlexOption {
    /// Compose every driving-side field name with this prefix before matching
    FieldNamePrefix(String),
    /// Replace the ignore set
    IgnoredFieldNames(BTreeSet<String>),
    /// Empty the ignore set
    NoIgnoredFieldNames,
}

/// Options for one Lower or Lift call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexOptions {
    pub field_name_prefix: Option<String>,
    pub ignored_field_names: BTreeSet<String>,
}

impl Default for FlexOptions {
    fn default() -> Self {
        Self {
            field_name_prefix: None,
            ignored_field_names: default_ignored_field_names().clone(),
        }
    }
}

impl FlexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with `options` applied in order, then validated
    pub fn with_options(options: impl IntoIterator<Item = FlexOption>) -> Result<Self> {
        let mut flex = Self::default();
        for option in options {
            flex.apply(option);
        }
        flex.validate()?;
        Ok(flex)
    }

    pub fn apply(&mut self, option: FlexOption) {
        match option {
            FlexOption::FieldNamePrefix(prefix) => self.field_name_prefix = Some(prefix),
            FlexOption::IgnoredFieldNames(names) => self.ignored_field_names = names,
            FlexOption::NoIgnoredFieldNames => self.ignored_field_names.clear(),
        }
    }

    /// Load options from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text).map_err(|source| Error::Json {
            message: "Failed to parse options".to_string(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(text).map_err(|source| Error::Yaml {
            message: "Failed to parse options".to_string(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.field_name_prefix {
            if !is_identifier(prefix) {
                return Err(Error::invalid_option(
                    "field_name_prefix",
                    format!("{prefix:?} is not a field name"),
                ));
            }
        }
        if let Some(name) = self.ignored_field_names.iter().find(|n| n.trim().is_empty()) {
            return Err(Error::invalid_option(
                "ignored_field_names",
                format!("{name:?} is not a field name"),
            ));
        }
        Ok(())
    }

    pub fn field_name_prefix(&self) -> Option<&str> {
        self.field_name_prefix.as_deref()
    }

    pub fn is_ignored_field(&self, name: &str) -> bool {
        self.ignored_field_names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignore_set() {
        let options = FlexOptions::default();
        assert!(options.is_ignored_field("Tags"));
        assert!(options.is_ignored_field("TagsAll"));
        assert!(!options.is_ignored_field("Name"));
        assert_eq!(options.field_name_prefix(), None);
    }

    #[test]
    fn test_functional_options() {
        let options = FlexOptions::with_options([
            FlexOption::FieldNamePrefix("Intent".to_string()),
            FlexOption::NoIgnoredFieldNames,
        ])
        .unwrap();
        assert_eq!(options.field_name_prefix(), Some("Intent"));
        assert!(!options.is_ignored_field("Tags"));

        let options = FlexOptions::with_options([FlexOption::IgnoredFieldNames(
            ["Region".to_string()].into_iter().collect(),
        )])
        .unwrap();
        assert!(options.is_ignored_field("Region"));
        assert!(!options.is_ignored_field("Tags"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let err = FlexOptions::with_options([FlexOption::FieldNamePrefix("".to_string())])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));

        let err = FlexOptions::with_options([FlexOption::FieldNamePrefix("9Lives".to_string())])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
    }

    #[test]
    fn test_from_json_and_yaml() {
        let options = FlexOptions::from_json_str(r#"{"field_name_prefix": "Bot"}"#).unwrap();
        assert_eq!(options.field_name_prefix(), Some("Bot"));
        assert!(options.is_ignored_field("Tags"));

        let options = FlexOptions::from_yaml_str("ignored_field_names: [Labels]\n").unwrap();
        assert!(options.is_ignored_field("Labels"));
        assert!(!options.is_ignored_field("Tags"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            FlexOptions::from_json_str("{").unwrap_err(),
            Error::Json { .. }
        ));
        assert!(matches!(
            FlexOptions::from_yaml_str("ignored_field_names: [\"\"]").unwrap_err(),
            Error::InvalidOption { .. }
        ));
    }
}
