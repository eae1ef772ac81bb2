//! Collection and map conversion
//!
//! Lists and sets map to slices element by element, maps to string-keyed
//! maps entry by entry. A failing element leaves its slot zero and the
//! remaining elements still convert. Nil and empty stay distinct in both
//! directions.
//!
//! A list of records matched against a Plain map uses the records'
//! map-block key field as the map key; the field itself is not converted.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::context::ConversionContext;
use super::expand::AutoExpander;
use super::fields::{tagged_field, tagged_field_mut, FieldHints, FieldResolver};
use super::flatten::AutoFlattener;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::model::{
    ObjectType, PlainType, PlainValue, TaggedData, TaggedState, TaggedType, TaggedValue,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

fn no_map_block_key(ctx: &ConversionContext<'_>, object_type: &ObjectType) -> Diagnostic {
    ctx.diagnostic(
        DiagnosticCode::NoMapBlockKey,
        format!(
            "Object type {} has no map block key field; mark one with the name MapBlockKey or the mapblockkey hint",
            object_type.name()
        ),
    )
}

impl AutoExpander<'_> {
    /// A known List or Set into a slice, keyed map or single record
    pub(super) fn collection(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        elem: &TaggedType,
        target: &mut PlainValue,
        diags: &mut Diagnostics,
    ) {
        let elements = source.elements().unwrap_or_default();
        let nested_objects = elem.object_type().is_some();

        match target {
            PlainValue::Slice {
                elem: target_elem,
                items,
            } => {
                *items = Some(self.elements(ctx, elements, target_elem, diags));
            }
            PlainValue::Ref {
                elem: PlainType::Slice(target_elem),
                value,
            } => {
                let items = self.elements(ctx, elements, target_elem, diags);
                *value = Some(Box::new(PlainValue::Slice {
                    elem: (**target_elem).clone(),
                    items: Some(items),
                }));
            }
            PlainValue::Map { .. }
            | PlainValue::Ref {
                elem: PlainType::Map(_),
                ..
            } if nested_objects => self.keyed_blocks(ctx, elements, elem, target, diags),
            PlainValue::Struct(_)
            | PlainValue::Interface { .. }
            | PlainValue::Ref {
                elem: PlainType::Struct(_),
                ..
            } if nested_objects => match elements.first() {
                Some(first) => {
                    let ctx = ctx.at_source_index(0);
                    self.convert(&ctx, first, target, &FieldHints::default(), diags);
                }
                None => trace!(
                    source_path = %ctx.source_path(),
                    "Empty collection, single record left absent"
                ),
            },
            _ => diags.push(ctx.incompatible(&source.ty, target.plain_type())),
        }
    }

    fn elements(
        &self,
        ctx: &ConversionContext<'_>,
        elements: &[TaggedValue],
        elem: &PlainType,
        diags: &mut Diagnostics,
    ) -> Vec<PlainValue> {
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| {
                let mut item = PlainValue::zero(elem);
                self.convert(&ctx.at_list_index(i), element, &mut item, &FieldHints::default(), diags);
                item
            })
            .collect()
    }

    /// A known Tagged map into a Plain map, keys copied verbatim
    pub(super) fn map(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        diags: &mut Diagnostics,
    ) {
        let Some(entries) = source.entries() else {
            return;
        };
        match target {
            PlainValue::Map {
                elem,
                entries: slot,
            } => {
                *slot = Some(self.entries(ctx, entries, elem, diags));
            }
            PlainValue::Ref {
                elem: PlainType::Map(elem),
                value,
            } => {
                let converted = self.entries(ctx, entries, elem, diags);
                *value = Some(Box::new(PlainValue::Map {
                    elem: (**elem).clone(),
                    entries: Some(converted),
                }));
            }
            _ => diags.push(ctx.incompatible(&source.ty, target.plain_type())),
        }
    }

    fn entries(
        &self,
        ctx: &ConversionContext<'_>,
        entries: &BTreeMap<String, TaggedValue>,
        elem: &PlainType,
        diags: &mut Diagnostics,
    ) -> BTreeMap<String, PlainValue> {
        entries
            .iter()
            .map(|(key, entry)| {
                let mut value = PlainValue::zero(elem);
                self.convert(&ctx.at_map_key(key), entry, &mut value, &FieldHints::default(), diags);
                (key.clone(), value)
            })
            .collect()
    }

    /// Records keyed by their map-block key into a Plain map
    fn keyed_blocks(
        &self,
        ctx: &ConversionContext<'_>,
        elements: &[TaggedValue],
        elem: &TaggedType,
        target: &mut PlainValue,
        diags: &mut Diagnostics,
    ) {
        let Some(object_type) = elem.object_type() else {
            return;
        };
        let Some(key_field) = FieldResolver::map_block_key(object_type) else {
            diags.push(no_map_block_key(ctx, object_type));
            return;
        };
        let value_type = match target.plain_type().unref() {
            PlainType::Map(value_type) => (**value_type).clone(),
            _ => return,
        };

        let mut converted = BTreeMap::new();
        for (i, element) in elements.iter().enumerate() {
            if !element.is_known() {
                continue;
            }
            let Some(key) = tagged_field(element, &key_field.index).and_then(TaggedValue::as_str) else {
                diags.push(ctx.at_source_index(i).diagnostic(
                    DiagnosticCode::SourceNotConvertible,
                    format!("Map block key {} is not set", key_field.declared_name),
                ));
                continue;
            };

            let mut value = PlainValue::zero(&value_type);
            let ctx = ctx.at_list_index_to_map_key(i, key);
            self.convert(&ctx, element, &mut value, &FieldHints::default(), diags);
            converted.insert(key.to_string(), value);
        }

        let map = PlainValue::Map {
            elem: value_type,
            entries: Some(converted),
        };
        match target {
            PlainValue::Ref { value, .. } => *value = Some(Box::new(map)),
            _ => *target = map,
        }
    }
}

impl AutoFlattener<'_> {
    /// A Plain slice into a Tagged List or Set
    pub(super) fn slice(
        &self,
        ctx: &ConversionContext<'_>,
        source: &PlainValue,
        items: Option<&[PlainValue]>,
        target: &mut TaggedValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        let elem = match &target.ty {
            TaggedType::List(elem) | TaggedType::Set(elem) => elem.as_ref().clone(),
            _ => {
                diags.push(ctx.incompatible(source.plain_type(), &target.ty));
                return;
            }
        };
        let Some(items) = items else {
            target.state = TaggedState::Null;
            return;
        };
        if items.is_empty() && hints.omit_empty {
            trace!(source_path = %ctx.source_path(), "Empty slice with omitempty lifted as null");
            target.state = TaggedState::Null;
            return;
        }

        let elements = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut element = TaggedValue::null(elem.clone());
                self.convert(&ctx.at_list_index(i), item, &mut element, &FieldHints::default(), diags);
                element
            })
            .collect();
        target.state = TaggedState::Known(TaggedData::Elements(elements));
    }

    /// A Plain map into a Tagged Map, or into keyed records
    pub(super) fn map(
        &self,
        ctx: &ConversionContext<'_>,
        source: &PlainValue,
        entries: Option<&BTreeMap<String, PlainValue>>,
        target: &mut TaggedValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        let keyed_object = match &target.ty {
            TaggedType::Map(_) => None,
            TaggedType::List(elem) | TaggedType::Set(elem) if elem.object_type().is_some() => {
                elem.object_type().cloned()
            }
            _ => {
                diags.push(ctx.incompatible(source.plain_type(), &target.ty));
                return;
            }
        };
        let Some(entries) = entries else {
            target.state = TaggedState::Null;
            return;
        };
        if entries.is_empty() && hints.omit_empty {
            trace!(source_path = %ctx.source_path(), "Empty map with omitempty lifted as null");
            target.state = TaggedState::Null;
            return;
        }

        if let Some(object_type) = keyed_object {
            self.keyed_blocks(ctx, entries, &object_type, target, diags);
            return;
        }

        let Some(elem) = target.ty.element_type().cloned() else {
            return;
        };
        let converted = entries
            .iter()
            .map(|(key, value)| {
                let mut entry = TaggedValue::null(elem.clone());
                self.convert(&ctx.at_map_key(key), value, &mut entry, &FieldHints::default(), diags);
                (key.clone(), entry)
            })
            .collect();
        target.state = TaggedState::Known(TaggedData::Entries(converted));
    }

    /// One record per map entry, the key written back into the marker field
    fn keyed_blocks(
        &self,
        ctx: &ConversionContext<'_>,
        entries: &BTreeMap<String, PlainValue>,
        object_type: &Arc<ObjectType>,
        target: &mut TaggedValue,
        diags: &mut Diagnostics,
    ) {
        let Some(key_field) = FieldResolver::map_block_key(object_type) else {
            diags.push(no_map_block_key(ctx, object_type));
            return;
        };

        let mut elements = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if value.is_nil() {
                trace!(source_path = %ctx.source_path(), key = %key, "Absent map entry skipped");
                continue;
            }
            let ctx = ctx.at_map_key_to_list_index(key, elements.len());
            let mut element = TaggedValue::empty_object(object_type);
            if let Some(slot) = tagged_field_mut(&mut element, &key_field.index) {
                slot.state = TaggedState::Known(TaggedData::Text(key.clone()));
            }
            self.convert(&ctx, value, &mut element, &FieldHints::default(), diags);
            elements.push(element);
        }
        target.state = TaggedState::Known(TaggedData::Elements(elements));
    }
}
