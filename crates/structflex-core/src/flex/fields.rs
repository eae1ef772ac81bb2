//! Field Resolver
//!
//! Enumerates the convertible fields of a record type on either side.
//! Embedded records are flattened into their parent; an outer field shadows
//! a promoted field with the same name. Each field carries its parsed
//! [`FieldHints`] and an index path for reaching it through the embedding
//! chain.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::options::FlexOptions;
use crate::error::{Error, Result};
use crate::model::{
    ObjectType, PlainType, PlainValue, StructType, StructValue, TaggedData, TaggedState, TaggedType,
    TaggedValue,
};
use std::collections::HashSet;
use tracing::trace;

/// Field name that marks the map-block key without an explicit hint
pub const MAP_BLOCK_KEY_FIELD_NAME: &str = "MapBlockKey";

/// Parsed per-field hint mini-language
///
/// `"-"` ignores the field. Otherwise the hint is an optional name override
/// followed by comma-separated options: `legacy`, `omitempty`, `mapblockkey`,
/// `noflatten` and `xmlwrapper=<items field>`. A `noflatten` field still
/// Lowers but is never written by Lift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldHints {
    pub name: Option<String>,
    pub ignore: bool,
    pub legacy: bool,
    pub omit_empty: bool,
    pub wrapper_items_field: Option<String>,
    pub map_block_key: bool,
    pub no_flatten: bool,
}

impl FieldHints {
    pub fn parse(field: &str, hint: &str) -> Result<Self> {
        let mut hints = Self::default();
        let mut parts = hint.split(',');

        match parts.next().map(str::trim) {
            Some("-") => {
                hints.ignore = true;
                return Ok(hints);
            }
            Some("") | None => {}
            Some(name) => {
                if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(Error::invalid_hint(field, hint, "name override is not a field name"));
                }
                hints.name = Some(name.to_string());
            }
        }

        for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                None if part == "legacy" => hints.legacy = true,
                None if part == "omitempty" => hints.omit_empty = true,
                None if part == "mapblockkey" => hints.map_block_key = true,
                None if part == "noflatten" => hints.no_flatten = true,
                Some(("xmlwrapper", items)) if !items.trim().is_empty() => {
                    hints.wrapper_items_field = Some(items.trim().to_string());
                }
                Some(("xmlwrapper", _)) => {
                    return Err(Error::invalid_hint(field, hint, "xmlwrapper needs an items field name"));
                }
                _ => {
                    return Err(Error::invalid_hint(
                        field,
                        hint,
                        format!("unknown option {part:?}"),
                    ));
                }
            }
        }

        Ok(hints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Tagged,
    Plain,
}

/// Type of a resolved field on whichever side owns it
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Tagged(TaggedType),
    Plain(PlainType),
}

/// A convertible field after flattening and hint parsing
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub side: Side,
    pub declared_name: String,
    /// Name used for matching, after any hint override
    pub canonical_name: String,
    pub hints: FieldHints,
    /// Field positions from the outer record through embedded records
    pub index: Vec<usize>,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Lists, sets, maps and slices take part in plural matching
    pub fn is_collection(&self) -> bool {
        match &self.field_type {
            FieldType::Tagged(ty) => ty.is_collection() || matches!(ty, TaggedType::Map(_)),
            FieldType::Plain(ty) => ty.is_collection(),
        }
    }

    pub fn tagged_type(&self) -> Option<&TaggedType> {
        match &self.field_type {
            FieldType::Tagged(ty) => Some(ty),
            FieldType::Plain(_) => None,
        }
    }

    pub fn plain_type(&self) -> Option<&PlainType> {
        match &self.field_type {
            FieldType::Plain(ty) => Some(ty),
            FieldType::Tagged(_) => None,
        }
    }
}

/// Enumerates convertible fields under the active options
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'a> {
    options: &'a FlexOptions,
}

impl<'a> FieldResolver<'a> {
    pub fn new(options: &'a FlexOptions) -> Self {
        Self { options }
    }

    /// Fields of a Tagged record that take part in field-wise conversion
    ///
    /// Ignored fields and the map-block key are left out.
    pub fn tagged_fields(&self, ty: &ObjectType) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();
        promote_tagged(ty, &[], &mut fields);
        fields.retain(|f| {
            if f.hints.ignore {
                trace!(side = ?f.side, field = %f.declared_name, object = ty.name(), "Skipping field with ignore hint");
                return false;
            }
            if self.options.is_ignored_field(&f.declared_name) {
                trace!(side = ?f.side, field = %f.declared_name, object = ty.name(), "Skipping ignored field");
                return false;
            }
            !f.hints.map_block_key
        });
        fields
    }

    /// Exported fields of a Plain record that take part in field-wise conversion
    pub fn plain_fields(&self, ty: &StructType) -> Vec<FieldDescriptor> {
        let mut fields = Vec::new();
        promote_plain(ty, &[], &mut fields);
        fields.retain(|f| {
            if self.options.is_ignored_field(&f.declared_name) {
                trace!(side = ?f.side, field = %f.declared_name, r#struct = ty.name(), "Skipping ignored field");
                return false;
            }
            true
        });
        fields
    }

    /// The map-block key field of a Tagged record, if it declares one
    pub fn map_block_key(ty: &ObjectType) -> Option<FieldDescriptor> {
        let mut fields = Vec::new();
        promote_tagged(ty, &[], &mut fields);
        fields.into_iter().find(|f| f.hints.map_block_key)
    }
}

fn promote_tagged(ty: &ObjectType, prefix: &[usize], out: &mut Vec<FieldDescriptor>) {
    let mut embedded = Vec::new();
    for (i, field) in ty.fields().iter().enumerate() {
        let mut index = prefix.to_vec();
        index.push(i);
        match (field.is_embedded(), field.ty()) {
            (true, TaggedType::Object(inner)) => embedded.push((index, inner)),
            _ => out.push(FieldDescriptor {
                side: Side::Tagged,
                declared_name: field.name().to_string(),
                canonical_name: field
                    .hints()
                    .name
                    .clone()
                    .unwrap_or_else(|| field.name().to_string()),
                hints: field.hints().clone(),
                index,
                field_type: FieldType::Tagged(field.ty().clone()),
            }),
        }
    }

    for (index, inner) in embedded {
        let mut promoted = Vec::new();
        promote_tagged(inner, &index, &mut promoted);
        append_unshadowed(out, promoted);
    }
}

fn promote_plain(ty: &StructType, prefix: &[usize], out: &mut Vec<FieldDescriptor>) {
    let mut embedded = Vec::new();
    for (i, field) in ty.fields().iter().enumerate() {
        let mut index = prefix.to_vec();
        index.push(i);
        if field.is_embedded() {
            if let Some(inner) = field.ty().struct_type() {
                embedded.push((index, inner));
                continue;
            }
        }
        if !field.is_exported() {
            continue;
        }
        out.push(FieldDescriptor {
            side: Side::Plain,
            declared_name: field.name().to_string(),
            canonical_name: field.name().to_string(),
            hints: FieldHints::default(),
            index,
            field_type: FieldType::Plain(field.ty().clone()),
        });
    }

    for (index, inner) in embedded {
        let mut promoted = Vec::new();
        promote_plain(inner, &index, &mut promoted);
        append_unshadowed(out, promoted);
    }
}

fn append_unshadowed(out: &mut Vec<FieldDescriptor>, promoted: Vec<FieldDescriptor>) {
    let taken: HashSet<String> = out.iter().map(|f| f.declared_name.clone()).collect();
    out.extend(promoted.into_iter().filter(|f| {
        let shadowed = taken.contains(&f.declared_name);
        if shadowed {
            trace!(side = ?f.side, field = %f.declared_name, "Promoted field shadowed by outer field");
        }
        !shadowed
    }));
}

/// Read a field through its index path
///
/// `None` when an enclosing embedded record is null or unknown.
pub(crate) fn tagged_field<'v>(value: &'v TaggedValue, index: &[usize]) -> Option<&'v TaggedValue> {
    let Some((first, rest)) = index.split_first() else {
        return Some(value);
    };
    match &value.state {
        TaggedState::Known(TaggedData::Fields(fields)) => tagged_field(fields.get(*first)?, rest),
        _ => None,
    }
}

/// Write access through an index path, allocating null embedded records
pub(crate) fn tagged_field_mut<'v>(
    value: &'v mut TaggedValue,
    index: &[usize],
) -> Option<&'v mut TaggedValue> {
    let Some((first, rest)) = index.split_first() else {
        return Some(value);
    };
    if !value.is_known() {
        let TaggedType::Object(ty) = &value.ty else {
            return None;
        };
        let fields = ty
            .fields()
            .iter()
            .map(|f| TaggedValue::null(f.ty().clone()))
            .collect();
        value.state = TaggedState::Known(TaggedData::Fields(fields));
    }
    match &mut value.state {
        TaggedState::Known(TaggedData::Fields(fields)) => tagged_field_mut(fields.get_mut(*first)?, rest),
        _ => None,
    }
}

/// Read a field through its index path, looking through embedded references
pub(crate) fn plain_field<'v>(value: &'v PlainValue, index: &[usize]) -> Option<&'v PlainValue> {
    let Some((first, rest)) = index.split_first() else {
        return Some(value);
    };
    match value {
        PlainValue::Struct(s) => plain_field(s.get(*first)?, rest),
        PlainValue::Ref { value: Some(inner), .. } => plain_field(inner, index),
        _ => None,
    }
}

pub(crate) fn struct_field<'v>(value: &'v StructValue, index: &[usize]) -> Option<&'v PlainValue> {
    let (first, rest) = index.split_first()?;
    plain_field(value.get(*first)?, rest)
}

/// Write access through an index path, allocating absent embedded references
pub(crate) fn plain_field_mut<'v>(
    value: &'v mut PlainValue,
    index: &[usize],
) -> Option<&'v mut PlainValue> {
    let Some((first, rest)) = index.split_first() else {
        return Some(value);
    };
    match value {
        PlainValue::Struct(s) => plain_field_mut(s.get_mut(*first)?, rest),
        PlainValue::Ref { elem, value: slot } => {
            let inner = slot.get_or_insert_with(|| Box::new(PlainValue::zero(elem)));
            plain_field_mut(inner, index)
        }
        _ => None,
    }
}
