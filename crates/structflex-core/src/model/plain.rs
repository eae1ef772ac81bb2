//! Plain Model: concrete back-end API data structures
//!
//! Plain values distinguish by-value fields from by-reference fields. An
//! unset by-reference field is an absent reference ([`PlainValue::Ref`] with
//! `value: None`), never a sentinel value. Slices and maps likewise keep
//! nil apart from empty.

use super::EnumType;
use crate::error::{Error, Result};
use crate::flex::hooks::Flattener;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Whether a Plain field holds its value directly or through a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Optionality {
    ByValue,
    ByReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlainKind {
    Bool,
    String,
    Bytes,
    Int32,
    Int64,
    Float32,
    Float64,
    Enum,
    Timestamp,
    Document,
    Ref,
    Slice,
    Map,
    Struct,
    Interface,
}

/// Full type of a Plain value
#[derive(Debug, Clone, PartialEq)]
pub enum PlainType {
    Bool,
    String,
    Bytes,
    Int32,
    Int64,
    Float32,
    Float64,
    Enum(Arc<EnumType>),
    Timestamp,
    Document,
    Ref(Box<PlainType>),
    Slice(Box<PlainType>),
    Map(Box<PlainType>),
    Struct(Arc<StructType>),
    Interface(Arc<InterfaceType>),
}

impl PlainType {
    pub fn reference(elem: PlainType) -> Self {
        Self::Ref(Box::new(elem))
    }

    pub fn slice(elem: PlainType) -> Self {
        Self::Slice(Box::new(elem))
    }

    pub fn map(elem: PlainType) -> Self {
        Self::Map(Box::new(elem))
    }

    pub fn structure(ty: &Arc<StructType>) -> Self {
        Self::Struct(Arc::clone(ty))
    }

    pub fn kind(&self) -> PlainKind {
        match self {
            Self::Bool => PlainKind::Bool,
            Self::String => PlainKind::String,
            Self::Bytes => PlainKind::Bytes,
            Self::Int32 => PlainKind::Int32,
            Self::Int64 => PlainKind::Int64,
            Self::Float32 => PlainKind::Float32,
            Self::Float64 => PlainKind::Float64,
            Self::Enum(_) => PlainKind::Enum,
            Self::Timestamp => PlainKind::Timestamp,
            Self::Document => PlainKind::Document,
            Self::Ref(_) => PlainKind::Ref,
            Self::Slice(_) => PlainKind::Slice,
            Self::Map(_) => PlainKind::Map,
            Self::Struct(_) => PlainKind::Struct,
            Self::Interface(_) => PlainKind::Interface,
        }
    }

    pub fn optionality(&self) -> Optionality {
        match self {
            Self::Ref(_) => Optionality::ByReference,
            _ => Optionality::ByValue,
        }
    }

    /// The referenced type for `Ref`, otherwise `self`
    pub fn unref(&self) -> &PlainType {
        match self {
            Self::Ref(elem) => elem,
            other => other,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::Ref(_) | Self::Slice(_) | Self::Map(_) | Self::Struct(_) | Self::Interface(_)
        )
    }

    /// Slice or map, looking through one reference
    pub fn is_collection(&self) -> bool {
        matches!(self.unref(), Self::Slice(_) | Self::Map(_))
    }

    /// Struct type of a struct or a reference to one
    pub fn struct_type(&self) -> Option<&Arc<StructType>> {
        match self.unref() {
            Self::Struct(ty) => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for PlainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "String"),
            Self::Bytes => write!(f, "Vec<u8>"),
            Self::Int32 => write!(f, "i32"),
            Self::Int64 => write!(f, "i64"),
            Self::Float32 => write!(f, "f32"),
            Self::Float64 => write!(f, "f64"),
            Self::Enum(ty) => write!(f, "{}", ty.name()),
            Self::Timestamp => write!(f, "DateTime<Utc>"),
            Self::Document => write!(f, "Document"),
            Self::Ref(elem) => write!(f, "Option<{elem}>"),
            Self::Slice(elem) => write!(f, "Vec<{elem}>"),
            Self::Map(elem) => write!(f, "BTreeMap<String, {elem}>"),
            Self::Struct(ty) => write!(f, "{}", ty.name()),
            Self::Interface(ty) => write!(f, "dyn {}", ty.name()),
        }
    }
}

/// A named capability that struct types may declare they implement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    name: String,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    name: String,
    ty: PlainType,
    exported: bool,
    embedded: bool,
}

impl StructField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &PlainType {
        &self.ty
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }
}

/// A Plain record type
#[derive(Debug)]
pub struct StructType {
    name: String,
    fields: Vec<StructField>,
    implements: BTreeSet<String>,
    flattener: Option<Arc<dyn Flattener>>,
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields && self.implements == other.implements
    }
}

impl StructType {
    pub fn builder(name: impl Into<String>) -> StructTypeBuilder {
        StructTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<(usize, &StructField)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Whether the struct satisfies the named interface
    pub fn implements(&self, interface: &str) -> bool {
        self.implements.contains(interface)
    }

    /// Custom Lift hook, when the type supplies one
    pub fn flattener(&self) -> Option<&Arc<dyn Flattener>> {
        self.flattener.as_ref()
    }
}

/// Fluent builder for [`StructType`]
pub struct StructTypeBuilder {
    name: String,
    fields: Vec<StructField>,
    implements: BTreeSet<String>,
    flattener: Option<Arc<dyn Flattener>>,
}

impl StructTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            implements: BTreeSet::new(),
            flattener: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: PlainType) -> Self {
        self.fields.push(StructField {
            name: name.into(),
            ty,
            exported: true,
            embedded: false,
        });
        self
    }

    /// A field the engine never reads or writes
    pub fn private_field(mut self, name: impl Into<String>, ty: PlainType) -> Self {
        self.fields.push(StructField {
            name: name.into(),
            ty,
            exported: false,
            embedded: false,
        });
        self
    }

    /// Embed a struct by value; its fields are promoted
    pub fn embed(mut self, ty: &Arc<StructType>) -> Self {
        self.fields.push(StructField {
            name: ty.name().to_string(),
            ty: PlainType::structure(ty),
            exported: true,
            embedded: true,
        });
        self
    }

    /// Embed a struct through a reference, allocated on first write
    pub fn embed_ref(mut self, ty: &Arc<StructType>) -> Self {
        self.fields.push(StructField {
            name: ty.name().to_string(),
            ty: PlainType::reference(PlainType::structure(ty)),
            exported: true,
            embedded: true,
        });
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.insert(interface.into());
        self
    }

    pub fn flattener(mut self, hook: Arc<dyn Flattener>) -> Self {
        self.flattener = Some(hook);
        self
    }

    pub fn build(self) -> Result<Arc<StructType>> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::DuplicateField {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        Ok(Arc::new(StructType {
            name: self.name,
            fields: self.fields,
            implements: self.implements,
            flattener: self.flattener,
        }))
    }
}

/// Value of a Plain record, fields positional per [`StructType::fields`]
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Vec<PlainValue>,
}

impl StructValue {
    /// Every field at its zero value
    pub fn zero(ty: &Arc<StructType>) -> Self {
        Self {
            ty: Arc::clone(ty),
            fields: ty.fields().iter().map(|f| PlainValue::zero(f.ty())).collect(),
        }
    }

    /// Build a value from named fields; unnamed fields stay zero
    pub fn with_fields<K: AsRef<str>>(
        ty: &Arc<StructType>,
        values: impl IntoIterator<Item = (K, PlainValue)>,
    ) -> Result<Self> {
        let mut value = Self::zero(ty);
        for (name, field_value) in values {
            let name = name.as_ref();
            let slot = value.field_mut(name).ok_or_else(|| Error::UnknownField {
                type_name: ty.name().to_string(),
                field: name.to_string(),
            })?;
            *slot = field_value;
        }
        Ok(value)
    }

    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn fields(&self) -> &[PlainValue] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&PlainValue> {
        self.fields.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PlainValue> {
        self.fields.get_mut(index)
    }

    pub fn field(&self, name: &str) -> Option<&PlainValue> {
        let (index, _) = self.ty.field(name)?;
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut PlainValue> {
        let (index, _) = self.ty.field(name)?;
        self.fields.get_mut(index)
    }

    pub fn is_well_formed(&self) -> bool {
        self.fields.len() == self.ty.fields().len()
    }
}

/// A Plain Model value
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Bool(bool),
    String(String),
    /// `None` is a nil byte slice
    Bytes(Option<Vec<u8>>),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Enum {
        ty: Arc<EnumType>,
        value: String,
    },
    Timestamp(DateTime<Utc>),
    Document(serde_json::Value),
    Ref {
        elem: PlainType,
        value: Option<Box<PlainValue>>,
    },
    Slice {
        elem: PlainType,
        items: Option<Vec<PlainValue>>,
    },
    Map {
        elem: PlainType,
        entries: Option<BTreeMap<String, PlainValue>>,
    },
    Struct(StructValue),
    Interface {
        ty: Arc<InterfaceType>,
        value: Option<Box<PlainValue>>,
    },
}

impl PlainValue {
    /// The zero value of a type: absent references, nil collections
    pub fn zero(ty: &PlainType) -> Self {
        match ty {
            PlainType::Bool => Self::Bool(false),
            PlainType::String => Self::String(String::new()),
            PlainType::Bytes => Self::Bytes(None),
            PlainType::Int32 => Self::Int32(0),
            PlainType::Int64 => Self::Int64(0),
            PlainType::Float32 => Self::Float32(0.0),
            PlainType::Float64 => Self::Float64(0.0),
            PlainType::Enum(ty) => Self::Enum {
                ty: Arc::clone(ty),
                value: String::new(),
            },
            PlainType::Timestamp => Self::Timestamp(DateTime::<Utc>::default()),
            PlainType::Document => Self::Document(serde_json::Value::Null),
            PlainType::Ref(elem) => Self::Ref {
                elem: (**elem).clone(),
                value: None,
            },
            PlainType::Slice(elem) => Self::Slice {
                elem: (**elem).clone(),
                items: None,
            },
            PlainType::Map(elem) => Self::Map {
                elem: (**elem).clone(),
                entries: None,
            },
            PlainType::Struct(ty) => Self::Struct(StructValue::zero(ty)),
            PlainType::Interface(ty) => Self::Interface {
                ty: Arc::clone(ty),
                value: None,
            },
        }
    }

    /// A present reference to `value`
    pub fn some(value: PlainValue) -> Self {
        Self::Ref {
            elem: value.plain_type(),
            value: Some(Box::new(value)),
        }
    }

    /// An absent reference to `elem`
    pub fn none(elem: PlainType) -> Self {
        Self::Ref { elem, value: None }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn slice(elem: PlainType, items: impl IntoIterator<Item = PlainValue>) -> Self {
        Self::Slice {
            elem,
            items: Some(items.into_iter().collect()),
        }
    }

    pub fn map<K: Into<String>>(
        elem: PlainType,
        entries: impl IntoIterator<Item = (K, PlainValue)>,
    ) -> Self {
        Self::Map {
            elem,
            entries: Some(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn enum_value(ty: &Arc<EnumType>, value: impl Into<String>) -> Self {
        Self::Enum {
            ty: Arc::clone(ty),
            value: value.into(),
        }
    }

    pub fn plain_type(&self) -> PlainType {
        match self {
            Self::Bool(_) => PlainType::Bool,
            Self::String(_) => PlainType::String,
            Self::Bytes(_) => PlainType::Bytes,
            Self::Int32(_) => PlainType::Int32,
            Self::Int64(_) => PlainType::Int64,
            Self::Float32(_) => PlainType::Float32,
            Self::Float64(_) => PlainType::Float64,
            Self::Enum { ty, .. } => PlainType::Enum(Arc::clone(ty)),
            Self::Timestamp(_) => PlainType::Timestamp,
            Self::Document(_) => PlainType::Document,
            Self::Ref { elem, .. } => PlainType::reference(elem.clone()),
            Self::Slice { elem, .. } => PlainType::slice(elem.clone()),
            Self::Map { elem, .. } => PlainType::map(elem.clone()),
            Self::Struct(s) => PlainType::Struct(Arc::clone(s.ty())),
            Self::Interface { ty, .. } => PlainType::Interface(Arc::clone(ty)),
        }
    }

    pub fn kind(&self) -> PlainKind {
        match self {
            Self::Bool(_) => PlainKind::Bool,
            Self::String(_) => PlainKind::String,
            Self::Bytes(_) => PlainKind::Bytes,
            Self::Int32(_) => PlainKind::Int32,
            Self::Int64(_) => PlainKind::Int64,
            Self::Float32(_) => PlainKind::Float32,
            Self::Float64(_) => PlainKind::Float64,
            Self::Enum { .. } => PlainKind::Enum,
            Self::Timestamp(_) => PlainKind::Timestamp,
            Self::Document(_) => PlainKind::Document,
            Self::Ref { .. } => PlainKind::Ref,
            Self::Slice { .. } => PlainKind::Slice,
            Self::Map { .. } => PlainKind::Map,
            Self::Struct(_) => PlainKind::Struct,
            Self::Interface { .. } => PlainKind::Interface,
        }
    }

    pub fn optionality(&self) -> Optionality {
        match self {
            Self::Ref { .. } => Optionality::ByReference,
            _ => Optionality::ByValue,
        }
    }

    /// Absent reference, nil interface, nil slice or nil map
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Ref { value: None, .. }
                | Self::Interface { value: None, .. }
                | Self::Slice { items: None, .. }
                | Self::Map { entries: None, .. }
                | Self::Bytes(None)
        )
    }

    /// Follow present references and interfaces to the concrete value
    pub fn concrete(&self) -> Option<&PlainValue> {
        match self {
            Self::Ref { value, .. } | Self::Interface { value, .. } => {
                value.as_deref().and_then(PlainValue::concrete)
            }
            other => Some(other),
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self.concrete()? {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            Self::Ref { value: Some(inner), .. } | Self::Interface { value: Some(inner), .. } => {
                inner.as_struct_mut()
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.concrete()? {
            Self::String(s) => Some(s),
            Self::Enum { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Field of a struct (or reference to one) by declared name
    pub fn field(&self, name: &str) -> Option<&PlainValue> {
        self.as_struct()?.field(name)
    }

    pub fn items(&self) -> Option<&[PlainValue]> {
        match self.concrete()? {
            Self::Slice { items, .. } => items.as_deref(),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&BTreeMap<String, PlainValue>> {
        match self.concrete()? {
            Self::Map { entries, .. } => entries.as_ref(),
            _ => None,
        }
    }

    /// Zero at this level: a scalar's zero, a nil or an empty collection
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(b) => !b,
            Self::String(s) => s.is_empty(),
            Self::Bytes(b) => b.as_ref().map_or(true, Vec::is_empty),
            Self::Int32(n) => *n == 0,
            Self::Int64(n) => *n == 0,
            Self::Float32(x) => *x == 0.0,
            Self::Float64(x) => *x == 0.0,
            Self::Enum { value, .. } => value.is_empty(),
            Self::Timestamp(t) => *t == DateTime::<Utc>::default(),
            Self::Document(doc) => doc.is_null(),
            Self::Ref { value, .. } | Self::Interface { value, .. } => value.is_none(),
            Self::Slice { items, .. } => items.as_ref().map_or(true, Vec::is_empty),
            Self::Map { entries, .. } => entries.as_ref().map_or(true, BTreeMap::is_empty),
            Self::Struct(s) => s.fields().iter().all(PlainValue::is_zero),
        }
    }

    /// Like [`is_zero`](Self::is_zero) but looks through present references
    pub fn is_deep_zero(&self) -> bool {
        match self {
            Self::Ref { value: Some(inner), .. } | Self::Interface { value: Some(inner), .. } => {
                inner.is_deep_zero()
            }
            Self::Struct(s) => s.fields().iter().all(PlainValue::is_deep_zero),
            other => other.is_zero(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Struct(s) => s.is_well_formed(),
            _ => true,
        }
    }
}

impl From<StructValue> for PlainValue {
    fn from(value: StructValue) -> Self {
        Self::Struct(value)
    }
}
