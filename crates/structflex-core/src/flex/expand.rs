//! Lower driver: Tagged Model to Plain Model
//!
//! For each (source, target) pair the driver tries a custom hook, then
//! field-wise record conversion, then scalar coercion, then collection and
//! map conversion. Anything else is an `IncompatibleTypes` diagnostic that
//! leaves the target at its zero value.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::coerce;
use super::context::{ConversionContext, Direction};
use super::fields::{plain_field_mut, tagged_field, FieldHints, FieldResolver};
use super::hooks::dispatch_expand;
use super::names::NameMatcher;
use super::options::FlexOptions;
use super::wrapper::CountedWrapper;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{PlainType, PlainValue, StructValue, TaggedState, TaggedType, TaggedValue};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info_span, trace};

/// Lower `source` into the value behind `target`
///
/// `target` must be a present [`PlainValue::Ref`]; the referenced value is
/// updated in place. A `None` or typed-nil source, or a target that is not
/// a present reference, produces a single diagnostic and nothing is written.
///
/// # Examples
///
/// ```
/// use structflex_core::{lower, FlexOptions, ObjectType, PlainType, PlainValue, StructType,
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
/// let source = TaggedValue::object(&model, [("Name", TaggedValue::string("logs"))]).unwrap();
/// let mut target = PlainValue::some(StructValue::zero(&bucket).into());
///
/// let diags = lower(Some(&source), Some(&mut target), &FlexOptions::default());
/// assert!(!diags.has_error());
/// assert_eq!(target.field("Name").and_then(|v| v.as_str()), Some("logs"));
/// ```
pub fn lower(
    source: Option<&TaggedValue>,
    target: Option<&mut PlainValue>,
    options: &FlexOptions,
) -> Diagnostics {
    let source_type = source.map_or_else(|| "nil".to_string(), |s| s.ty.to_string());
    let target_type = target
        .as_deref()
        .map_or_else(|| "nil".to_string(), |t| t.plain_type().to_string());
    let span = info_span!(
        "autoflex",
        operation = "lower",
        source_type = %source_type,
        target_type = %target_type
    );
    let _guard = span.enter();

    let ctx = ConversionContext::new(Direction::Lower, options);
    let mut diags = Diagnostics::new();
    AutoExpander::new(options).top_level(&ctx, source, target, &mut diags);
    diags
}

/// Recursive Lower state shared by every node of one call
pub(crate) struct AutoExpander<'a> {
    pub(super) resolver: FieldResolver<'a>,
    pub(super) matcher: NameMatcher<'a>,
}

impl<'a> AutoExpander<'a> {
    pub(crate) fn new(options: &'a FlexOptions) -> Self {
        Self {
            resolver: FieldResolver::new(options),
            matcher: NameMatcher::new(options),
        }
    }

    fn top_level(
        &self,
        ctx: &ConversionContext<'_>,
        source: Option<&TaggedValue>,
        target: Option<&mut PlainValue>,
        diags: &mut Diagnostics,
    ) {
        let Some(source) = source else {
            diags.push(ctx.diagnostic(DiagnosticCode::NilSource, "Cannot expand nil source"));
            return;
        };
        if source.ty.object_type().is_some() && source.is_null() {
            diags.push(ctx.diagnostic(
                DiagnosticCode::NilSource,
                format!("Cannot expand typed nil source of type {}", source.ty),
            ));
            return;
        }
        let Some(PlainValue::Ref {
            value: Some(target),
            ..
        }) = target
        else {
            diags.push(ctx.diagnostic(
                DiagnosticCode::NilOrNonReferenceTarget,
                "Target must be a present reference",
            ));
            return;
        };

        self.convert(ctx, source, target, &FieldHints::default(), diags);
    }

    /// Lower one node; `hints` are those of the Tagged field being converted
    pub(super) fn convert(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        trace!(
            source_path = %ctx.source_path(),
            target_path = %ctx.target_path(),
            source_type = %source.ty,
            target_type = %target.plain_type(),
            "Expanding"
        );

        if !source.is_well_formed() {
            diags.push(ctx.diagnostic(
                DiagnosticCode::SourceNotConvertible,
                format!("Source value does not have the shape of {}", source.ty),
            ));
            return;
        }
        if !target.is_well_formed() {
            diags.push(ctx.diagnostic(
                DiagnosticCode::TargetNotConvertible,
                format!("Target value does not have the shape of {}", target.plain_type()),
            ));
            return;
        }

        match &source.state {
            TaggedState::Null => {
                trace!(source_path = %ctx.source_path(), "Null source, target left unset");
                return;
            }
            TaggedState::Unknown => {
                trace!(source_path = %ctx.source_path(), "Unknown source, target left unset");
                return;
            }
            TaggedState::Known(_) => {}
        }

        if let Some(hook) = source.ty.object_type().and_then(|o| o.expander()) {
            dispatch_expand(ctx, hook, source, target, diags);
            return;
        }

        match &source.ty {
            TaggedType::Object(_) => self.object(ctx, source, target, diags),
            TaggedType::List(elem) | TaggedType::Set(elem) => {
                self.collection(ctx, source, elem, target, diags)
            }
            TaggedType::Map(_) => self.map(ctx, source, target, diags),
            _ => coerce::lower_scalar(ctx, source, target, hints, diags),
        }
    }

    fn object(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        diags: &mut Diagnostics,
    ) {
        match target {
            PlainValue::Struct(_) => self.object_into_struct(ctx, source, target, diags),
            PlainValue::Ref {
                elem: PlainType::Struct(ty),
                value,
            } => {
                let inner =
                    value.get_or_insert_with(|| Box::new(PlainValue::Struct(StructValue::zero(ty))));
                self.object_into_struct(ctx, source, inner, diags);
            }
            _ => diags.push(ctx.incompatible(&source.ty, target.plain_type())),
        }
    }

    /// Field-wise conversion of a known object into a struct value
    pub(super) fn object_into_struct(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        diags: &mut Diagnostics,
    ) {
        let Some(object_type) = source.ty.object_type() else {
            return;
        };
        let Some(struct_type) = target.as_struct().map(|s| Arc::clone(s.ty())) else {
            return;
        };

        let source_fields = self.resolver.tagged_fields(object_type);
        let target_fields = self.resolver.plain_fields(&struct_type);

        for field in &source_fields {
            let value = match tagged_field(source, &field.index) {
                Some(value) => Cow::Borrowed(value),
                None => match field.tagged_type() {
                    Some(ty) => Cow::Owned(TaggedValue::null(ty.clone())),
                    None => continue,
                },
            };

            let target_field = self.matcher.find(field, &source_fields, &target_fields);

            if let Some(items) = &field.hints.wrapper_items_field {
                // A matched field that is itself a counted wrapper takes the collection
                let nested = target_field.and_then(|target_field| {
                    let wrapper = target_field
                        .plain_type()
                        .and_then(PlainType::struct_type)
                        .and_then(|ty| CountedWrapper::detect(ty, items))?;
                    Some((target_field, wrapper))
                });
                if let Some((target_field, wrapper)) = nested {
                    let ctx = ctx.at_names(&field.declared_name, &target_field.declared_name);
                    match plain_field_mut(target, &target_field.index) {
                        Some(slot) => {
                            self.lower_wrapper(&ctx, &value, slot, &wrapper, &field.hints, diags)
                        }
                        None => debug!(target_path = %ctx.target_path(), "Target field cannot be set"),
                    }
                    continue;
                }

                // Otherwise this struct is the counted wrapper of the hinted field
                if let Some(wrapper) = CountedWrapper::detect(&struct_type, items) {
                    let ctx = ctx.at_source_name(&field.declared_name);
                    self.fill_wrapper(&ctx, &value, target, &wrapper, diags);
                    continue;
                }
            }

            let Some(target_field) = target_field else {
                trace!(
                    source_path = %ctx.source_path(),
                    field = %field.declared_name,
                    target_type = struct_type.name(),
                    "No corresponding field"
                );
                continue;
            };

            let ctx = ctx.at_names(&field.declared_name, &target_field.declared_name);
            let Some(slot) = plain_field_mut(target, &target_field.index) else {
                debug!(target_path = %ctx.target_path(), "Target field cannot be set");
                continue;
            };

            self.convert(&ctx, &value, slot, &field.hints, diags);
        }
    }
}
