//! Counted wrapper collapse and expand
//!
//! A counted wrapper is a Plain struct pairing an items slice with a
//! `Quantity` (or `Count`) field. The Tagged side either models the whole
//! wrapper as one collection field (rule 1) or keeps it as its own nested
//! record whose items sub-field carries the `xmlwrapper` hint (rule 2).
//! In both cases the count is derived from the items on Lower and ignored
//! on Lift.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::context::ConversionContext;
use super::expand::AutoExpander;
use super::fields::FieldHints;
use super::flatten::AutoFlattener;
use crate::diagnostics::Diagnostics;
use crate::model::{
    ObjectType, PlainType, PlainValue, StructType, StructValue, TaggedState, TaggedValue,
};
use std::sync::Arc;
use tracing::trace;

const COUNT_FIELD_NAMES: &[&str] = &["Quantity", "Count"];

/// Positions of the items and count fields within a wrapper struct
#[derive(Debug, Clone)]
pub(crate) struct CountedWrapper {
    pub(crate) ty: Arc<StructType>,
    pub(crate) items_index: usize,
    pub(crate) items_name: String,
    pub(crate) count_index: usize,
}

impl CountedWrapper {
    /// `ty` is a counted wrapper whose items field is `items_field`
    pub(crate) fn detect(ty: &Arc<StructType>, items_field: &str) -> Option<Self> {
        let (items_index, items) = ty.fields().iter().enumerate().find(|(_, f)| {
            f.name().eq_ignore_ascii_case(items_field) && matches!(f.ty().unref(), PlainType::Slice(_))
        })?;
        let (count_index, _) = ty.fields().iter().enumerate().find(|(_, f)| {
            COUNT_FIELD_NAMES.iter().any(|n| f.name().eq_ignore_ascii_case(n))
                && matches!(f.ty().unref(), PlainType::Int32 | PlainType::Int64)
        })?;
        Some(Self {
            ty: Arc::clone(ty),
            items_index,
            items_name: items.name().to_string(),
            count_index,
        })
    }

    /// Nil or empty items and every other non-count field at its zero value
    pub(crate) fn is_empty(&self, value: &StructValue) -> bool {
        value.fields().iter().enumerate().all(|(i, field)| {
            i == self.count_index
                || (i == self.items_index && field.items().map_or(true, <[_]>::is_empty))
                || field.is_deep_zero()
        })
    }
}

fn set_count(slot: &mut PlainValue, count: usize) {
    let value = match slot.plain_type().unref() {
        PlainType::Int32 => PlainValue::Int32(i32::try_from(count).unwrap_or(i32::MAX)),
        PlainType::Int64 => PlainValue::Int64(i64::try_from(count).unwrap_or(i64::MAX)),
        _ => return,
    };
    *slot = if matches!(slot, PlainValue::Ref { .. }) {
        PlainValue::some(value)
    } else {
        value
    };
}

/// Tagged field of `object_type` whose hint names the items field of `ty`
pub(crate) fn hinted_wrapper(
    ty: &Arc<StructType>,
    object_type: &ObjectType,
) -> Option<CountedWrapper> {
    object_type.fields().iter().find_map(|f| {
        let items = f.hints().wrapper_items_field.as_deref()?;
        CountedWrapper::detect(ty, items)
    })
}

impl AutoExpander<'_> {
    /// Rule 1: a Tagged collection into a whole wrapper
    pub(super) fn lower_wrapper(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        wrapper: &CountedWrapper,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        if !source.is_known() && hints.omit_empty {
            trace!(
                source_path = %ctx.source_path(),
                "Absent collection with omitempty, wrapper left absent"
            );
            return;
        }

        let mut value = PlainValue::Struct(StructValue::zero(&wrapper.ty));
        self.fill_wrapper(ctx, source, &mut value, wrapper, diags);
        match target {
            PlainValue::Ref { value: slot, .. } => *slot = Some(Box::new(value)),
            _ => *target = value,
        }
    }

    /// Items from the collection, count from the number of items
    pub(super) fn fill_wrapper(
        &self,
        ctx: &ConversionContext<'_>,
        source: &TaggedValue,
        target: &mut PlainValue,
        wrapper: &CountedWrapper,
        diags: &mut Diagnostics,
    ) {
        let Some(value) = target.as_struct_mut() else {
            return;
        };
        if let Some(items) = value.get_mut(wrapper.items_index) {
            let ctx = ctx.at_target_name(&wrapper.items_name);
            self.convert(&ctx, source, items, &FieldHints::default(), diags);
        }

        let count = value
            .get(wrapper.items_index)
            .and_then(PlainValue::items)
            .map_or(0, <[_]>::len);
        if let Some(slot) = value.get_mut(wrapper.count_index) {
            set_count(slot, count);
        }
    }
}

impl AutoFlattener<'_> {
    /// Rule 1: a whole wrapper into a Tagged collection
    pub(super) fn lift_wrapper(
        &self,
        ctx: &ConversionContext<'_>,
        source: &PlainValue,
        target: &mut TaggedValue,
        wrapper: &CountedWrapper,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        let Some(items) = source.as_struct().and_then(|s| s.get(wrapper.items_index)) else {
            trace!(source_path = %ctx.source_path(), "Absent wrapper lifted as null");
            target.state = TaggedState::Null;
            return;
        };
        let hints = FieldHints {
            wrapper_items_field: None,
            ..hints.clone()
        };
        let ctx = ctx.at_source_name(&wrapper.items_name);
        self.convert(&ctx, items, target, &hints, diags);
    }

    /// Rule 2: the items of a present wrapper always lift as a present collection
    pub(super) fn lift_wrapper_items(
        &self,
        ctx: &ConversionContext<'_>,
        items: &PlainValue,
        target: &mut TaggedValue,
        hints: &FieldHints,
        diags: &mut Diagnostics,
    ) {
        let hints = FieldHints {
            omit_empty: false,
            wrapper_items_field: None,
            ..hints.clone()
        };
        match items.plain_type().unref() {
            PlainType::Slice(elem) if items.items().is_none() => {
                let empty = PlainValue::Slice {
                    elem: (**elem).clone(),
                    items: Some(Vec::new()),
                };
                self.convert(ctx, &empty, target, &hints, diags);
            }
            _ => self.convert(ctx, items, target, &hints, diags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper_type(count: PlainType) -> Arc<StructType> {
        StructType::builder("TrustedSigners")
            .field("Enabled", PlainType::reference(PlainType::Bool))
            .field("Items", PlainType::slice(PlainType::String))
            .field("Quantity", count)
            .build()
            .unwrap()
    }

    #[test]
    fn test_detect() {
        let ty = wrapper_type(PlainType::reference(PlainType::Int32));
        let wrapper = CountedWrapper::detect(&ty, "Items").unwrap();
        assert_eq!(wrapper.items_index, 1);
        assert_eq!(wrapper.count_index, 2);
        assert!(CountedWrapper::detect(&ty, "Signers").is_none());

        let no_count = StructType::builder("Bare")
            .field("Items", PlainType::slice(PlainType::String))
            .build()
            .unwrap();
        assert!(CountedWrapper::detect(&no_count, "Items").is_none());
    }

    #[test]
    fn test_set_count_respects_optionality() {
        let mut slot = PlainValue::none(PlainType::Int32);
        set_count(&mut slot, 3);
        assert_eq!(slot, PlainValue::some(PlainValue::Int32(3)));

        let mut slot = PlainValue::Int64(9);
        set_count(&mut slot, 0);
        assert_eq!(slot, PlainValue::Int64(0));
    }

    #[test]
    fn test_is_empty_ignores_count_and_present_false() {
        let ty = wrapper_type(PlainType::Int64);
        let wrapper = CountedWrapper::detect(&ty, "Items").unwrap();

        let value = StructValue::with_fields(
            &ty,
            [
                ("Enabled", PlainValue::some(PlainValue::Bool(false))),
                ("Items", PlainValue::slice(PlainType::String, [])),
                ("Quantity", PlainValue::Int64(4)),
            ],
        )
        .unwrap();
        assert!(wrapper.is_empty(&value));

        let value = StructValue::with_fields(
            &ty,
            [("Enabled", PlainValue::some(PlainValue::Bool(true)))],
        )
        .unwrap();
        assert!(!wrapper.is_empty(&value));
    }
}
