//! Lift driver: Plain Model to Tagged Model
//!
//! Mirrors the Lower driver. Absent references lift as null (or as a zero
//! value in legacy mode), nil collections as null, and struct values fill a
//! Tagged object field by field.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::coerce;
use super::context::{ConversionContext, Direction};
use super::fields::{struct_field, tagged_field_mut, FieldDescriptor, FieldHints, FieldResolver};
use super::hooks::dispatch_flatten;
use super::names::NameMatcher;
use super::options::FlexOptions;
use super::wrapper::{hinted_wrapper, CountedWrapper};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{
    PlainType, PlainValue, StructValue, TaggedData, TaggedState, TaggedType, TaggedValue,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info_span, trace};

/// Lift `source` into `target`
///
/// `target` is updated in place; its type decides the shape produced. A
/// `None` source, an absent reference as the source, or a `None` target
/// produces a single diagnostic and nothing is written.
///
/// # Examples
///
/// ```
/// use structflex_core::{lift, FlexOptions, ObjectType, PlainType, PlainValue, StructType,
///     StructValue, TaggedType, TaggedValue};
///
/// let model = ObjectType::builder("BucketModel")
///     .field("Name", TaggedType::String)
///     .build()
///     .unwrap();
/// let bucket = StructType::builder("Bucket")
///     .field("Name", PlainType::reference(PlainType::String))
///     .build()
///     .unwrap();
///
/// let source: PlainValue = StructValue::with_fields(
///     &bucket,
///     [("Name", PlainValue::some(PlainValue::string("logs")))],
/// )
/// .unwrap()
/// .into();
/// let mut target = TaggedValue::null(TaggedType::object(&model));
///
/// let diags = lift(Some(&source), Some(&mut target), &FlexOptions::default());
/// assert!(!diags.has_error());
/// assert_eq!(target.field("Name"), Some(&TaggedValue::string("logs")));
/// ```
pub fn lift(
    source: Option<&PlainValue>,
    target: Option<&mut TaggedValue>,
    options: &FlexOptions,
) -> Diagnostics {
    let source_type = source.map_or_else(|| "nil".to_string(), |s| s.plain_type().to_string());
    let target_type = target
        .as_deref()
        .map_or_else(|| "nil".to_string(), |t| t.ty.to_string());
    let span = info_span!(
        "autoflex",
        operation = "lift",
        source_type = %source_type,
        target_type = %target_type
    );
    let _guard = span.enter();

    let ctx = ConversionContext::new(Direction::Lift, options);
    let mut diags = Diagnostics::new();
    AutoFlattener::new(options).top_level(&ctx, source, target, &mut diags);
    diags
}

/// Recursive Lift state shared by every node of one call
pub(crate) struct AutoFlattener<'a> {
    pub(super) resolver: FieldResolver<'a>,
    pub(super) matcher: NameMatcher<'a>,
}

impl<'a> AutoFlattener<'a> {
    pub(crate) fn new(options: &'a FlexOptions) -> Self {
        Self {
            resolver: FieldResolver::new(options),
            matcher: NameMatcher::new(options),
        }
    }

    fn top_level(
        &self,
        ctx: &ConversionContext<'_>,
        source: Option<&PlainValue>,
        target: Option<&mut TaggedValue>,
        diags: &mut Diagnostics,
    ) {
        let Some(source) = source else {
            diags.push(ctx.diagnostic(DiagnosticCode::NilSource, "Cannot flatten nil source"));
            return;
        };
        if matches!(
            source,
            PlainValue::Ref { value: None, .. } | PlainValue::Interface { value: None, .. }
        ) {
            diags.push(ctx.diagnostic(
                DiagnosticCode::NilSource,
                format!("Cannot flatten typed nil source of type {}", source.plain_type()),
            ));
            return;
        }
        let Some(target) = target else {
            diags.push(ctx.diagnostic(
                DiagnosticCode::NilOrNonReferenceTarget,
                "Target must be a present reference",
            ));
            return;
        };

        self.convert(ctx, source, target, &FieldHints::default(), diags);
    }

    /// Lift one node; `hints` are those of the Tagged field being produced
    pub(super) fn convert(
        &self,
        ctx: &ConversionContext<'_>,
        source: &PlainValue,
        target: &mut TaggedValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        trace!(
            source_path = %ctx.source_path(),
            target_path = %ctx.target_path(),
            source_type = %source.plain_type(),
            target_type = %target.ty,
            "Flattening"
        );

        if !source.is_well_formed() {
            diags.push(ctx.diagnostic(
                DiagnosticCode::SourceNotConvertible,
                format!("Source value does not have the shape of {}", source.plain_type()),
            ));
            return;
        }
        if !target.is_well_formed() {
            diags.push(ctx.diagnostic(
                DiagnosticCode::TargetNotConvertible,
                format!("Target value does not have the shape of {}", target.ty),
            ));
            return;
        }

        match source {
            PlainValue::Ref { elem, .. } if elem.is_scalar() => {
                coerce::lift_scalar(ctx, source, target, hints, diags)
            }
            PlainValue::Ref { value: None, .. } | PlainValue::Interface { value: None, .. } => {
                trace!(source_path = %ctx.source_path(), "Absent reference lifted as null");
                target.state = TaggedState::Null;
            }
            PlainValue::Ref {
                value: Some(inner), ..
            }
            | PlainValue::Interface {
                value: Some(inner), ..
            } => self.convert(ctx, inner, target, hints, diags),
            PlainValue::Struct(value) => self.structure(ctx, source, value, target, hints, diags),
            PlainValue::Slice { items, .. } => {
                self.slice(ctx, source, items.as_deref(), target, hints, diags)
            }
            PlainValue::Map { entries, .. } => {
                self.map(ctx, source, entries.as_ref(), target, hints, diags)
            }
            _ => coerce::lift_scalar(ctx, source, target, hints, diags),
        }
    }

    /// A struct into an object, or into a one-element list of objects
    fn structure(
        &self,
        ctx: &ConversionContext<'_>,
        source: &PlainValue,
        value: &StructValue,
        target: &mut TaggedValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        if let Some(hook) = value.ty().flattener() {
            dispatch_flatten(ctx, hook, source, target, diags);
            return;
        }

        let (object_type, as_element) = match &target.ty {
            TaggedType::Object(object_type) => (Arc::clone(object_type), false),
            TaggedType::List(elem) | TaggedType::Set(elem) if elem.object_type().is_some() => {
                let Some(object_type) = elem.object_type() else {
                    return;
                };
                (Arc::clone(object_type), true)
            }
            _ => {
                diags.push(ctx.incompatible(source.plain_type(), &target.ty));
                return;
            }
        };

        if hints.omit_empty {
            let empty = hinted_wrapper(value.ty(), &object_type).is_some_and(|w| w.is_empty(value));
            if empty {
                trace!(source_path = %ctx.source_path(), "Empty wrapper with omitempty lifted as null");
                target.state = TaggedState::Null;
                return;
            }
        }

        if as_element {
            let mut element = TaggedValue::empty_object(&object_type);
            self.struct_into_object(&ctx.at_target_index(0), value, &mut element, diags);
            target.state = TaggedState::Known(TaggedData::Elements(vec![element]));
            return;
        }

        if !target.is_known() {
            *target = TaggedValue::empty_object(&object_type);
        }
        self.struct_into_object(ctx, value, target, diags);
    }

    /// The hinted Tagged field whose counted wrapper is `source` itself
    ///
    /// A hinted field that matches a nested wrapper field of `source` is
    /// lifted from that field instead.
    fn enclosing_wrapper<'f>(
        &self,
        source: &StructValue,
        source_fields: &[FieldDescriptor],
        target_fields: &'f [FieldDescriptor],
    ) -> Option<(CountedWrapper, &'f FieldDescriptor)> {
        target_fields.iter().find_map(|tagged| {
            let items = tagged.hints.wrapper_items_field.as_deref()?;
            let wrapper = CountedWrapper::detect(source.ty(), items)?;
            let nested = self
                .matcher
                .find(tagged, target_fields, source_fields)
                .and_then(FieldDescriptor::plain_type)
                .and_then(PlainType::struct_type)
                .and_then(|ty| CountedWrapper::detect(ty, items));
            nested.is_none().then_some((wrapper, tagged))
        })
    }

    /// Field-wise conversion of a struct into a known object
    fn struct_into_object(
        &self,
        ctx: &ConversionContext<'_>,
        source: &StructValue,
        target: &mut TaggedValue,
        diags: &mut Diagnostics,
    ) {
        let Some(object_type) = target.ty.object_type().cloned() else {
            return;
        };

        let source_fields = self.resolver.plain_fields(source.ty());
        let target_fields = self.resolver.tagged_fields(&object_type);
        let enclosing = self.enclosing_wrapper(source, &source_fields, &target_fields);

        for field in &source_fields {
            let value = match struct_field(source, &field.index) {
                Some(value) => Cow::Borrowed(value),
                None => match field.plain_type() {
                    Some(ty) => Cow::Owned(PlainValue::zero(ty)),
                    None => continue,
                },
            };

            // This struct is itself the counted wrapper of a hinted field
            if let Some((wrapper, items_target)) = &enclosing {
                if field.index == [wrapper.count_index] {
                    continue;
                }
                if field.index == [wrapper.items_index] {
                    let ctx = ctx.at_names(&field.declared_name, &items_target.declared_name);
                    if items_target.hints.no_flatten {
                        trace!(target_path = %ctx.target_path(), "Skipping field with noflatten hint");
                    } else if let Some(slot) = tagged_field_mut(target, &items_target.index) {
                        self.lift_wrapper_items(&ctx, &value, slot, &items_target.hints, diags);
                    }
                    continue;
                }
            }

            let Some(target_field) = self.matcher.find(field, &source_fields, &target_fields) else {
                trace!(
                    source_path = %ctx.source_path(),
                    field = %field.declared_name,
                    target_type = object_type.name(),
                    "No corresponding field"
                );
                continue;
            };

            let ctx = ctx.at_names(&field.declared_name, &target_field.declared_name);
            if target_field.hints.no_flatten {
                trace!(target_path = %ctx.target_path(), "Skipping field with noflatten hint");
                continue;
            }
            let Some(slot) = tagged_field_mut(target, &target_field.index) else {
                debug!(target_path = %ctx.target_path(), "Target field cannot be set");
                continue;
            };

            if let Some(items) = &target_field.hints.wrapper_items_field {
                let wrapper = field
                    .plain_type()
                    .and_then(PlainType::struct_type)
                    .and_then(|ty| CountedWrapper::detect(ty, items));
                if let Some(wrapper) = wrapper {
                    self.lift_wrapper(&ctx, &value, slot, &wrapper, &target_field.hints, diags);
                    continue;
                }
            }

            self.convert(&ctx, &value, slot, &target_field.hints, diags);
        }
    }
}
