//! Value models on both sides of a conversion
//!
//! - [`tagged`]: the dynamic, nullable Tagged Model (null/unknown/known states)
//! - [`plain`]: the concrete Plain Model of a back-end API
//! - [`path`]: locations inside either value graph, used by diagnostics
//!
//! Neither model is tied to a serialization format. Record types on both
//! sides are described at runtime by [`ObjectType`] and [`StructType`] values
//! built with their fluent builders.

pub mod path;
pub mod plain;
pub mod tagged;

pub use path::{Path, PathStep};
pub use plain::{
    InterfaceType, Optionality, PlainKind, PlainType, PlainValue, StructField, StructType,
    StructTypeBuilder, StructValue,
};
pub use tagged::{
    ObjectField, ObjectType, ObjectTypeBuilder, OpaqueKind, TaggedData, TaggedKind, TaggedState,
    TaggedType, TaggedValue,
};

use std::sync::Arc;

/// A closed set of string values shared by Tagged enums and Plain enums
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    values: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether `value` is one of the declared members
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}
