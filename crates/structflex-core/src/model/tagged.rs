//! Tagged Model: dynamic, nullable, self-describing values
//!
//! Every [`TaggedValue`] carries its own [`TaggedType`] and one of three
//! states: null, unknown (not yet computed) or known. Record shapes are
//! described by [`ObjectType`], whose fields carry parsed [`FieldHints`].

use super::EnumType;
use crate::error::{Error, Result};
use crate::flex::fields::{FieldHints, MAP_BLOCK_KEY_FIELD_NAME};
use crate::flex::hooks::{ExpandHook, Expander, TypedExpander};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Leaf types with a domain-specific textual representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpaqueKind {
    /// RFC 3339 timestamp text
    Timestamp,
    /// JSON document text
    Document,
    /// Opaque string identifier
    Identifier,
}

/// Kind of a Tagged value, independent of element or record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaggedKind {
    Bool,
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    List,
    Set,
    Map,
    Object,
    Enum,
    Opaque,
}

/// Full type of a Tagged value
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedType {
    Bool,
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    List(Box<TaggedType>),
    Set(Box<TaggedType>),
    Map(Box<TaggedType>),
    Object(Arc<ObjectType>),
    Enum(Arc<EnumType>),
    Opaque(OpaqueKind),
}

impl TaggedType {
    pub fn list(elem: TaggedType) -> Self {
        Self::List(Box::new(elem))
    }

    pub fn set(elem: TaggedType) -> Self {
        Self::Set(Box::new(elem))
    }

    pub fn map(elem: TaggedType) -> Self {
        Self::Map(Box::new(elem))
    }

    pub fn object(ty: &Arc<ObjectType>) -> Self {
        Self::Object(Arc::clone(ty))
    }

    pub fn kind(&self) -> TaggedKind {
        match self {
            Self::Bool => TaggedKind::Bool,
            Self::String => TaggedKind::String,
            Self::Int32 => TaggedKind::Int32,
            Self::Int64 => TaggedKind::Int64,
            Self::Float32 => TaggedKind::Float32,
            Self::Float64 => TaggedKind::Float64,
            Self::List(_) => TaggedKind::List,
            Self::Set(_) => TaggedKind::Set,
            Self::Map(_) => TaggedKind::Map,
            Self::Object(_) => TaggedKind::Object,
            Self::Enum(_) => TaggedKind::Enum,
            Self::Opaque(_) => TaggedKind::Opaque,
        }
    }

    /// Element type of a List, Set or Map
    pub fn element_type(&self) -> Option<&TaggedType> {
        match self {
            Self::List(elem) | Self::Set(elem) | Self::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// List or Set
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_))
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::List(_) | Self::Set(_) | Self::Map(_) | Self::Object(_)
        )
    }

    /// Types whose known payload is text
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Enum(_) | Self::Opaque(_))
    }

    pub fn object_type(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Self::Object(ty) => Some(ty),
            _ => None,
        }
    }

    /// Record type of an Object, or of the elements of a List/Set of Objects
    pub fn nested_object_type(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Self::Object(ty) => Some(ty),
            Self::List(elem) | Self::Set(elem) => elem.object_type(),
            _ => None,
        }
    }
}

impl fmt::Display for TaggedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(elem) => write!(f, "List[{elem}]"),
            Self::Set(elem) => write!(f, "Set[{elem}]"),
            Self::Map(elem) => write!(f, "Map[{elem}]"),
            Self::Object(ty) => write!(f, "Object[{}]", ty.name()),
            Self::Enum(ty) => write!(f, "Enum[{}]", ty.name()),
            Self::Opaque(kind) => write!(f, "{kind:?}"),
            scalar => write!(f, "{:?}", scalar.kind()),
        }
    }
}

/// A field of a Tagged record type
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    name: String,
    ty: TaggedType,
    hints: FieldHints,
    embedded: bool,
}

impl ObjectField {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TaggedType {
        &self.ty
    }

    pub fn hints(&self) -> &FieldHints {
        &self.hints
    }

    /// Embedded records have their fields promoted into the parent
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }
}

/// A Tagged record type
#[derive(Debug)]
pub struct ObjectType {
    name: String,
    fields: Vec<ObjectField>,
    expander: Option<ExpandHook>,
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl ObjectType {
    pub fn builder(name: impl Into<String>) -> ObjectTypeBuilder {
        ObjectTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[ObjectField] {
        &self.fields
    }

    /// Direct (non-promoted) field by declared name
    pub fn field(&self, name: &str) -> Option<(usize, &ObjectField)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Custom Lower hook, when the type supplies one
    pub fn expander(&self) -> Option<&ExpandHook> {
        self.expander.as_ref()
    }
}

struct PendingField {
    name: String,
    ty: TaggedType,
    hint: Option<String>,
    embedded: bool,
}

/// Fluent builder for [`ObjectType`]
pub struct ObjectTypeBuilder {
    name: String,
    fields: Vec<PendingField>,
    expander: Option<ExpandHook>,
}

impl ObjectTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            expander: None,
        }
    }

    /// Add a field without hints
    pub fn field(mut self, name: impl Into<String>, ty: TaggedType) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            ty,
            hint: None,
            embedded: false,
        });
        self
    }

    /// Add a field with a hint string such as `",legacy"` or `"-"`
    pub fn field_with_hint(
        mut self,
        name: impl Into<String>,
        ty: TaggedType,
        hint: impl Into<String>,
    ) -> Self {
        self.fields.push(PendingField {
            name: name.into(),
            ty,
            hint: Some(hint.into()),
            embedded: false,
        });
        self
    }

    /// Embed another record type; its fields are promoted into this one
    pub fn embed(mut self, ty: &Arc<ObjectType>) -> Self {
        self.fields.push(PendingField {
            name: ty.name().to_string(),
            ty: TaggedType::Object(Arc::clone(ty)),
            hint: None,
            embedded: true,
        });
        self
    }

    pub fn expander(mut self, hook: Arc<dyn Expander>) -> Self {
        self.expander = Some(ExpandHook::Untyped(hook));
        self
    }

    pub fn typed_expander(mut self, hook: Arc<dyn TypedExpander>) -> Self {
        self.expander = Some(ExpandHook::Typed(hook));
        self
    }

    /// Validate field names and hints and produce the shared type
    pub fn build(self) -> Result<Arc<ObjectType>> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for pending in self.fields {
            if !seen.insert(pending.name.clone()) {
                return Err(Error::DuplicateField {
                    type_name: self.name,
                    field: pending.name,
                });
            }

            let mut hints = match &pending.hint {
                Some(hint) => FieldHints::parse(&pending.name, hint)?,
                None => FieldHints::default(),
            };
            if pending.name == MAP_BLOCK_KEY_FIELD_NAME {
                hints.map_block_key = true;
            }

            if hints.wrapper_items_field.is_some() && !pending.ty.is_collection() {
                return Err(Error::invalid_hint(
                    &pending.name,
                    pending.hint.unwrap_or_default(),
                    "xmlwrapper requires a list or set field",
                ));
            }
            if hints.map_block_key && !pending.ty.is_textual() {
                return Err(Error::invalid_hint(
                    &pending.name,
                    pending.hint.unwrap_or_default(),
                    "map block key must be a string, enum or identifier",
                ));
            }

            fields.push(ObjectField {
                name: pending.name,
                ty: pending.ty,
                hints,
                embedded: pending.embedded,
            });
        }

        Ok(Arc::new(ObjectType {
            name: self.name,
            fields,
            expander: self.expander,
        }))
    }
}

/// Null, unknown or known
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedState {
    Null,
    Unknown,
    Known(TaggedData),
}

/// Payload of a known Tagged value
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedData {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// String, Enum and Opaque payloads
    Text(String),
    /// List and Set elements, in source order
    Elements(Vec<TaggedValue>),
    Entries(BTreeMap<String, TaggedValue>),
    /// Object fields, positional per [`ObjectType::fields`]
    Fields(Vec<TaggedValue>),
}

/// A Tagged Model value
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    pub ty: TaggedType,
    pub state: TaggedState,
}

impl TaggedValue {
    pub fn new(ty: TaggedType, state: TaggedState) -> Self {
        Self { ty, state }
    }

    pub fn null(ty: TaggedType) -> Self {
        Self::new(ty, TaggedState::Null)
    }

    pub fn unknown(ty: TaggedType) -> Self {
        Self::new(ty, TaggedState::Unknown)
    }

    fn known(ty: TaggedType, data: TaggedData) -> Self {
        Self::new(ty, TaggedState::Known(data))
    }

    pub fn bool(value: bool) -> Self {
        Self::known(TaggedType::Bool, TaggedData::Bool(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::known(TaggedType::String, TaggedData::Text(value.into()))
    }

    pub fn int32(value: i32) -> Self {
        Self::known(TaggedType::Int32, TaggedData::Int32(value))
    }

    pub fn int64(value: i64) -> Self {
        Self::known(TaggedType::Int64, TaggedData::Int64(value))
    }

    pub fn float32(value: f32) -> Self {
        Self::known(TaggedType::Float32, TaggedData::Float32(value))
    }

    pub fn float64(value: f64) -> Self {
        Self::known(TaggedType::Float64, TaggedData::Float64(value))
    }

    pub fn enum_value(ty: &Arc<EnumType>, value: impl Into<String>) -> Self {
        Self::known(
            TaggedType::Enum(Arc::clone(ty)),
            TaggedData::Text(value.into()),
        )
    }

    pub fn opaque(kind: OpaqueKind, text: impl Into<String>) -> Self {
        Self::known(TaggedType::Opaque(kind), TaggedData::Text(text.into()))
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::opaque(
            OpaqueKind::Timestamp,
            value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )
    }

    pub fn list(elem: TaggedType, items: impl IntoIterator<Item = TaggedValue>) -> Self {
        Self::known(
            TaggedType::list(elem),
            TaggedData::Elements(items.into_iter().collect()),
        )
    }

    pub fn set(elem: TaggedType, items: impl IntoIterator<Item = TaggedValue>) -> Self {
        Self::known(
            TaggedType::set(elem),
            TaggedData::Elements(items.into_iter().collect()),
        )
    }

    pub fn map<K: Into<String>>(
        elem: TaggedType,
        entries: impl IntoIterator<Item = (K, TaggedValue)>,
    ) -> Self {
        Self::known(
            TaggedType::map(elem),
            TaggedData::Entries(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        )
    }

    /// Known object with every field null
    pub fn empty_object(ty: &Arc<ObjectType>) -> Self {
        let fields = ty
            .fields()
            .iter()
            .map(|f| TaggedValue::null(f.ty().clone()))
            .collect();
        Self::known(TaggedType::Object(Arc::clone(ty)), TaggedData::Fields(fields))
    }

    /// Known object from named field values; unnamed fields stay null
    pub fn object<K: AsRef<str>>(
        ty: &Arc<ObjectType>,
        values: impl IntoIterator<Item = (K, TaggedValue)>,
    ) -> Result<Self> {
        let mut object = Self::empty_object(ty);
        for (name, value) in values {
            let name = name.as_ref();
            let slot = object.field_mut(name).ok_or_else(|| Error::UnknownField {
                type_name: ty.name().to_string(),
                field: name.to_string(),
            })?;
            *slot = value;
        }
        Ok(object)
    }

    pub fn kind(&self) -> TaggedKind {
        self.ty.kind()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.state, TaggedState::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.state, TaggedState::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self.state, TaggedState::Known(_))
    }

    pub fn data(&self) -> Option<&TaggedData> {
        match &self.state {
            TaggedState::Known(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data()? {
            TaggedData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data()? {
            TaggedData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.data()? {
            TaggedData::Int32(n) => Some(i64::from(*n)),
            TaggedData::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.data()? {
            TaggedData::Float32(x) => Some(f64::from(*x)),
            TaggedData::Float64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn elements(&self) -> Option<&[TaggedValue]> {
        match self.data()? {
            TaggedData::Elements(items) => Some(items),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&BTreeMap<String, TaggedValue>> {
        match self.data()? {
            TaggedData::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    /// Direct field of a known object, by declared name
    pub fn field(&self, name: &str) -> Option<&TaggedValue> {
        let (index, _) = self.ty.object_type()?.field(name)?;
        match self.data()? {
            TaggedData::Fields(fields) => fields.get(index),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut TaggedValue> {
        let (index, _) = self.ty.object_type()?.field(name)?;
        match &mut self.state {
            TaggedState::Known(TaggedData::Fields(fields)) => fields.get_mut(index),
            _ => None,
        }
    }

    /// Whether the known payload has the shape its type claims
    ///
    /// Only the outermost level is checked; children are validated as the
    /// engine reaches them.
    pub fn is_well_formed(&self) -> bool {
        let data = match &self.state {
            TaggedState::Known(data) => data,
            _ => return true,
        };
        match (&self.ty, data) {
            (TaggedType::Bool, TaggedData::Bool(_))
            | (TaggedType::Int32, TaggedData::Int32(_))
            | (TaggedType::Int64, TaggedData::Int64(_))
            | (TaggedType::Float32, TaggedData::Float32(_))
            | (TaggedType::Float64, TaggedData::Float64(_))
            | (TaggedType::String | TaggedType::Enum(_) | TaggedType::Opaque(_), TaggedData::Text(_))
            | (TaggedType::List(_) | TaggedType::Set(_), TaggedData::Elements(_))
            | (TaggedType::Map(_), TaggedData::Entries(_)) => true,
            (TaggedType::Object(ty), TaggedData::Fields(fields)) => {
                fields.len() == ty.fields().len()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_type() -> Arc<ObjectType> {
        ObjectType::builder("Widget")
            .field("Name", TaggedType::String)
            .field_with_hint("Size", TaggedType::Int64, ",legacy")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_parses_hints() {
        let ty = widget_type();
        let (index, size) = ty.field("Size").unwrap();
        assert_eq!(index, 1);
        assert!(size.hints().legacy);
        assert!(!ty.field("Name").unwrap().1.hints().legacy);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let err = ObjectType::builder("Widget")
            .field("Name", TaggedType::String)
            .field("Name", TaggedType::Int64)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateField { .. }));
    }

    #[test]
    fn test_builder_marks_map_block_key_by_name() {
        let ty = ObjectType::builder("Rule")
            .field("MapBlockKey", TaggedType::String)
            .field("Action", TaggedType::String)
            .build()
            .unwrap();
        assert!(ty.field("MapBlockKey").unwrap().1.hints().map_block_key);
    }

    #[test]
    fn test_builder_rejects_wrapper_hint_on_scalar() {
        let err = ObjectType::builder("Bad")
            .field_with_hint("Items", TaggedType::String, ",xmlwrapper=Items")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidHint { .. }));
    }

    #[test]
    fn test_object_constructor() {
        let ty = widget_type();
        let value = TaggedValue::object(&ty, [("Name", TaggedValue::string("gear"))]).unwrap();
        assert_eq!(value.field("Name").and_then(|v| v.as_str()), Some("gear"));
        assert!(value.field("Size").unwrap().is_null());

        let err = TaggedValue::object(&ty, [("Colour", TaggedValue::string("red"))]).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_well_formed() {
        assert!(TaggedValue::string("x").is_well_formed());
        assert!(TaggedValue::null(TaggedType::Int64).is_well_formed());

        let bad = TaggedValue::new(TaggedType::Int64, TaggedState::Known(TaggedData::Text("1".into())));
        assert!(!bad.is_well_formed());

        let ty = widget_type();
        let short = TaggedValue::new(
            TaggedType::object(&ty),
            TaggedState::Known(TaggedData::Fields(vec![TaggedValue::string("a")])),
        );
        assert!(!short.is_well_formed());
    }

    #[test]
    fn test_type_display() {
        let ty = widget_type();
        assert_eq!(TaggedType::list(TaggedType::String).to_string(), "List[String]");
        assert_eq!(TaggedType::object(&ty).to_string(), "Object[Widget]");
        assert_eq!(TaggedType::Opaque(OpaqueKind::Timestamp).to_string(), "Timestamp");
        assert_eq!(TaggedType::Int32.to_string(), "Int32");
    }

    #[test]
    fn test_timestamp_text() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(TaggedValue::timestamp(at).as_str(), Some("2024-05-01T12:30:00Z"));
    }
}
