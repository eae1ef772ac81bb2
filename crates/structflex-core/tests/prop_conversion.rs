//! Property-based tests for the conversion engine
//!
//! These tests verify invariants that should hold for all inputs to Lower
//! and Lift.


use proptest::prelude::*;
use std::sync::Arc;
use structflex_core::{
    DiagnosticCode, FlexOptions, ObjectType, PlainType, PlainValue, StructType, TaggedType,
    TaggedValue,
};
use test_support::*;

/// A scalar Tagged value together with its matching optional Plain type
#[derive(Debug, Clone)]
enum Scalar {
    String(Option<String>),
    Int64(Option<i64>),
    Bool(Option<bool>),
    Float64(Option<f64>),
}

impl Scalar {
    fn tagged_type(&self) -> TaggedType {
        match self {
            Self::String(_) => TaggedType::String,
            Self::Int64(_) => TaggedType::Int64,
            Self::Bool(_) => TaggedType::Bool,
            Self::Float64(_) => TaggedType::Float64,
        }
    }

    fn plain_type(&self) -> PlainType {
        let elem = match self {
            Self::String(_) => PlainType::String,
            Self::Int64(_) => PlainType::Int64,
            Self::Bool(_) => PlainType::Bool,
            Self::Float64(_) => PlainType::Float64,
        };
        PlainType::reference(elem)
    }

    fn tagged_value(&self) -> TaggedValue {
        let value = match self {
            Self::String(v) => v.clone().map(TaggedValue::string),
            Self::Int64(v) => v.map(TaggedValue::int64),
            Self::Bool(v) => v.map(TaggedValue::bool),
            Self::Float64(v) => v.map(TaggedValue::float64),
        };
        value.unwrap_or_else(|| TaggedValue::null(self.tagged_type()))
    }
}

// Strategy functions for property testing

fn scalar_strategy() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        proptest::option::of("[a-zA-Z0-9 _.-]{0,24}").prop_map(Scalar::String),
        proptest::option::of(any::<i64>()).prop_map(Scalar::Int64),
        proptest::option::of(any::<bool>()).prop_map(Scalar::Bool),
        proptest::option::of(-1.0e12f64..1.0e12).prop_map(Scalar::Float64),
    ]
}

fn shapes(scalar: &Scalar, hint: &str) -> (Arc<ObjectType>, Arc<StructType>) {
    let model = ObjectType::builder("Model")
        .field_with_hint("Value", scalar.tagged_type(), hint)
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("Value", scalar.plain_type())
        .build()
        .unwrap();
    (model, api)
}

proptest! {
    #[test]
    fn prop_pointer_scalars_round_trip(scalar in scalar_strategy()) {
        let (model, api) = shapes(&scalar, "");
        let source = TaggedValue::object(&model, [("Value", scalar.tagged_value())]).unwrap();
        let options = FlexOptions::default();

        let (plain, diags) = lower_into(&source, &api, &options);
        prop_assert!(diags.is_empty());
        let (lifted, diags) = lift_into(&plain, &model, &options);
        prop_assert!(diags.is_empty());

        prop_assert_eq!(lifted, source);
    }

    #[test]
    fn prop_legacy_lower_collapses_only_empty(value in "[a-z]{0,8}") {
        let scalar = Scalar::String(Some(value.clone()));
        let (model, api) = shapes(&scalar, ",legacy");
        let source = TaggedValue::object(&model, [("Value", scalar.tagged_value())]).unwrap();

        let (plain, diags) = lower_into(&source, &api, &FlexOptions::default());
        prop_assert!(diags.is_empty());

        let lowered = plain.field("Value").unwrap();
        if value.is_empty() {
            prop_assert!(lowered.is_nil());
        } else {
            prop_assert_eq!(lowered.as_str(), Some(value.as_str()));
        }
    }

    #[test]
    fn prop_diagnostics_are_additive(fields in prop::collection::vec(any::<bool>(), 1..12)) {
        // `true` marks a field whose 32-bit Tagged value cannot widen into i64
        let mut model = ObjectType::builder("Model");
        let mut api = StructType::builder("Api");
        let mut values = Vec::new();
        for (i, bad) in fields.iter().enumerate() {
            let name = format!("Field{i}");
            let (ty, value) = if *bad {
                (TaggedType::Int32, TaggedValue::int32(i as i32 + 1))
            } else {
                (TaggedType::Int64, TaggedValue::int64(i as i64 + 1))
            };
            model = model.field(name.clone(), ty);
            api = api.field(name.clone(), PlainType::Int64);
            values.push((name, value));
        }
        let model = model.build().unwrap();
        let api = api.build().unwrap();
        let source = TaggedValue::object(&model, values).unwrap();

        let (plain, diags) = lower_into(&source, &api, &FlexOptions::default());

        let bad = fields.iter().filter(|b| **b).count();
        prop_assert_eq!(diags.len(), bad);
        prop_assert!(diags.iter().all(|d| d.code == DiagnosticCode::IncompatibleTypes));
        for (i, bad) in fields.iter().enumerate() {
            let expected = if *bad { 0 } else { i as i64 + 1 };
            prop_assert_eq!(
                plain.field(&format!("Field{i}")),
                Some(&PlainValue::Int64(expected))
            );
        }
    }

    #[test]
    fn prop_lists_keep_order(items in prop::collection::vec("[a-z]{1,6}", 0..16)) {
        let model = ObjectType::builder("Model")
            .field("Name", TaggedType::list(TaggedType::String))
            .build()
            .unwrap();
        let api = StructType::builder("Api")
            .field("Names", PlainType::slice(PlainType::reference(PlainType::String)))
            .build()
            .unwrap();
        let tagged: Vec<TaggedValue> = items.iter().map(TaggedValue::string).collect();
        let source = TaggedValue::object(
            &model,
            [("Name", TaggedValue::list(TaggedType::String, tagged))],
        )
        .unwrap();

        let (plain, diags) = lower_into(&source, &api, &FlexOptions::default());
        prop_assert!(diags.is_empty());
        let lowered: Vec<&str> = plain
            .field("Names")
            .and_then(PlainValue::items)
            .unwrap()
            .iter()
            .filter_map(PlainValue::as_str)
            .collect();
        prop_assert_eq!(&lowered, &items.iter().map(String::as_str).collect::<Vec<_>>());

        let (lifted, diags) = lift_into(&plain, &model, &FlexOptions::default());
        prop_assert!(diags.is_empty());
        prop_assert_eq!(lifted, source);
    }
}
