//! Attribute paths used to locate a node in either value graph

use serde::{Serialize, Serializer};
use std::fmt;

/// One step of a [`Path`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A record field
    Name(String),
    /// A position inside a list, set or slice
    ListIndex(usize),
    /// A key inside a map
    MapKey(String),
}

/// Location of a value relative to the root of a conversion
///
/// Rendered as `Root.Field[0]["key"]`. Paths are cheap to extend; every
/// extension returns a new path and leaves the parent untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// The empty (root) path
    pub fn root() -> Self {
        Self::default()
    }

    /// Child path for a record field
    pub fn at_name(&self, name: impl Into<String>) -> Self {
        self.with_step(PathStep::Name(name.into()))
    }

    /// Child path for a list element
    pub fn at_list_index(&self, index: usize) -> Self {
        self.with_step(PathStep::ListIndex(index))
    }

    /// Child path for a map entry
    pub fn at_map_key(&self, key: impl Into<String>) -> Self {
        self.with_step(PathStep::MapKey(key.into()))
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Name of the innermost field step, if any
    pub fn last_name(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|step| match step {
            PathStep::Name(name) => Some(name.as_str()),
            _ => None,
        })
    }

    fn with_step(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend(self.steps.iter().cloned());
        steps.push(step);
        Self { steps }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Name(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Name(name) => write!(f, ".{name}")?,
                PathStep::ListIndex(index) => write!(f, "[{index}]")?,
                PathStep::MapKey(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().map(|s| PathStep::Name(s.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rendering() {
        let path = Path::root()
            .at_name("Distribution")
            .at_name("Origins")
            .at_list_index(0)
            .at_name("Headers")
            .at_map_key("x-api-key");
        assert_eq!(
            path.to_string(),
            r#"Distribution.Origins[0].Headers["x-api-key"]"#
        );
        assert_eq!(path.last_name(), Some("Headers"));
    }

    #[test]
    fn test_root_path_is_empty() {
        let root = Path::root();
        assert!(root.is_root());
        assert_eq!(root.to_string(), "");
        assert_eq!(root.last_name(), None);
    }

    #[test]
    fn test_extension_leaves_parent_untouched() {
        let parent: Path = ["A", "B"].into_iter().collect();
        let child = parent.at_list_index(3);
        assert_eq!(parent.len(), 2);
        assert_eq!(child.len(), 3);
        assert_eq!(child.to_string(), "A.B[3]");
    }

    #[test]
    fn test_path_serializes_as_string() {
        let path = Path::root().at_name("Rules").at_list_index(1);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"Rules[1]\"");
    }
}
