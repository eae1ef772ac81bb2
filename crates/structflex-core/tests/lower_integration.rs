//! End-to-end tests for Lower (Tagged Model to Plain Model)


use pretty_assertions::assert_eq;
use structflex_core::{
    lower, DiagnosticCode, EnumType, FlexOption, FlexOptions, ObjectType, OpaqueKind, PlainType,
    PlainValue, StructType, StructValue, TaggedType, TaggedValue,
};
use test_support::*;

#[test]
fn test_normal_mode_keeps_empty_as_present() {
    let (target, diags) = lower_into(
        &TaggedValue::object(&string_model(""), [("Value", TaggedValue::string(""))]).unwrap(),
        &string_api(),
        &FlexOptions::default(),
    );

    assert!(diags.is_empty());
    assert_eq!(
        target.field("Value"),
        Some(&PlainValue::some(PlainValue::string("")))
    );
}

#[test]
fn test_legacy_mode_collapses_empty_to_absent() {
    let model = string_model(",legacy");
    let (target, diags) = lower_into(
        &TaggedValue::object(&model, [("Value", TaggedValue::string(""))]).unwrap(),
        &string_api(),
        &FlexOptions::default(),
    );

    assert!(diags.is_empty());
    assert!(target.field("Value").unwrap().is_nil());

    let (target, _) = lower_into(
        &TaggedValue::object(&model, [("Value", TaggedValue::string("set"))]).unwrap(),
        &string_api(),
        &FlexOptions::default(),
    );
    assert_eq!(target.field("Value").and_then(PlainValue::as_str), Some("set"));
}

#[test]
fn test_numeric_narrowing_is_allowed() {
    let model = ObjectType::builder("Sizes")
        .field("Count", TaggedType::Int64)
        .field("Ratio", TaggedType::Float64)
        .build()
        .unwrap();
    let api = StructType::builder("Sizes")
        .field("Count", PlainType::Int32)
        .field("Ratio", PlainType::reference(PlainType::Float32))
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [("Count", TaggedValue::int64(42)), ("Ratio", TaggedValue::float64(0.5))],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty(), "{}", diags.report());
    assert_eq!(target.field("Count"), Some(&PlainValue::Int32(42)));
    assert_eq!(
        target.field("Ratio"),
        Some(&PlainValue::some(PlainValue::Float32(0.5)))
    );
}

#[test]
fn test_numeric_widening_is_rejected() {
    let model = ObjectType::builder("Sizes")
        .field("Count", TaggedType::Int32)
        .field("Ratio", TaggedType::Float32)
        .build()
        .unwrap();
    let api = StructType::builder("Sizes")
        .field("Count", PlainType::Int64)
        .field("Ratio", PlainType::Float64)
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [("Count", TaggedValue::int32(42)), ("Ratio", TaggedValue::float32(0.5))],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert_eq!(diags.error_count(), 2);
    assert_eq!(diags.with_code(DiagnosticCode::IncompatibleTypes).len(), 2);
    assert_eq!(target.field("Count"), Some(&PlainValue::Int64(0)));
    assert_eq!(target.field("Ratio"), Some(&PlainValue::Float64(0.0)));
}

#[test]
fn test_one_bad_field_among_five() {
    let model = ObjectType::builder("Queue")
        .field("Name", TaggedType::String)
        .field("Delay", TaggedType::Int64)
        .field("Fifo", TaggedType::Bool)
        .field("Policy", TaggedType::Opaque(OpaqueKind::Document))
        .field("Retention", TaggedType::Int32)
        .build()
        .unwrap();
    let api = StructType::builder("Queue")
        .field("Name", PlainType::reference(PlainType::String))
        .field("Delay", PlainType::reference(PlainType::Int64))
        .field("Fifo", PlainType::Bool)
        .field("Policy", PlainType::Document)
        .field("Retention", PlainType::reference(PlainType::Int64))
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("Name", TaggedValue::string("jobs")),
            ("Delay", TaggedValue::int64(30)),
            ("Fifo", TaggedValue::bool(true)),
            ("Policy", TaggedValue::opaque(OpaqueKind::Document, r#"{"Version":"1"}"#)),
            ("Retention", TaggedValue::int32(4)),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());

    assert_eq!(diags.len(), 1);
    let d = diags.first_error().unwrap();
    assert_eq!(d.code, DiagnosticCode::IncompatibleTypes);
    assert_eq!(d.path.to_string(), "Retention");
    assert_eq!(d.target_type.as_deref(), Some("Option<i64>"));

    assert_eq!(target.field("Name").and_then(PlainValue::as_str), Some("jobs"));
    assert_eq!(
        target.field("Delay"),
        Some(&PlainValue::some(PlainValue::Int64(30)))
    );
    assert_eq!(target.field("Fifo"), Some(&PlainValue::Bool(true)));
    assert_eq!(
        target.field("Policy"),
        Some(&PlainValue::Document(serde_json::json!({"Version": "1"})))
    );
    assert!(target.field("Retention").unwrap().is_nil());
}

#[test]
fn test_plural_field_names() {
    let model = ObjectType::builder("Network")
        .field("City", TaggedType::list(TaggedType::String))
        .field("Datum", TaggedType::list(TaggedType::String))
        .field("Vertex", TaggedType::set(TaggedType::String))
        .build()
        .unwrap();
    let api = StructType::builder("Network")
        .field("Cities", PlainType::slice(PlainType::reference(PlainType::String)))
        .field("Data", PlainType::slice(PlainType::String))
        .field("Vertices", PlainType::slice(PlainType::String))
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("City", TaggedValue::list(TaggedType::String, strings(&["paris", "london"]))),
            ("Datum", TaggedValue::list(TaggedType::String, strings(&["d1"]))),
            ("Vertex", TaggedValue::set(TaggedType::String, strings(&["v1", "v2"]))),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());

    assert!(diags.is_empty(), "{}", diags.report());
    let cities: Vec<_> = target
        .field("Cities")
        .and_then(PlainValue::items)
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(cities, vec!["paris", "london"]);
    assert_eq!(
        target.field("Data").and_then(PlainValue::items),
        Some(plain_strings(&["d1"]).as_slice())
    );
    assert_eq!(
        target.field("Vertices").and_then(PlainValue::items),
        Some(plain_strings(&["v1", "v2"]).as_slice())
    );
}

#[test]
fn test_plural_stage_does_not_steal_exact_match() {
    let model = ObjectType::builder("Model")
        .field("Rules", TaggedType::list(TaggedType::String))
        .field("Rule", TaggedType::list(TaggedType::String))
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("Rules", PlainType::slice(PlainType::String))
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("Rules", TaggedValue::list(TaggedType::String, strings(&["exact"]))),
            ("Rule", TaggedValue::list(TaggedType::String, strings(&["plural"]))),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty());
    assert_eq!(
        target.field("Rules").and_then(PlainValue::items),
        Some(plain_strings(&["exact"]).as_slice())
    );
}

#[test]
fn test_null_and_empty_collections_stay_distinct() {
    let model = ObjectType::builder("Model")
        .field("Names", TaggedType::list(TaggedType::String))
        .field("Aliases", TaggedType::list(TaggedType::String))
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("Names", PlainType::slice(PlainType::String))
        .field("Aliases", PlainType::slice(PlainType::String))
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [("Aliases", TaggedValue::list(TaggedType::String, []))],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty());
    assert!(target.field("Names").unwrap().is_nil());
    assert_eq!(target.field("Aliases").and_then(PlainValue::items), Some(&[][..]));
}

#[test]
fn test_ignored_fields() {
    let model = ObjectType::builder("Model")
        .field("Name", TaggedType::String)
        .field("Tags", TaggedType::map(TaggedType::String))
        .field_with_hint("Internal", TaggedType::String, "-")
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("Name", PlainType::String)
        .field("Tags", PlainType::map(PlainType::String))
        .field("Internal", PlainType::String)
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("Name", TaggedValue::string("n")),
            ("Tags", TaggedValue::map(TaggedType::String, [("env", TaggedValue::string("prod"))])),
            ("Internal", TaggedValue::string("secret")),
        ],
    )
    .unwrap();

    let (target, _) = lower_into(&source, &api, &FlexOptions::default());
    assert!(target.field("Tags").unwrap().is_nil());
    assert_eq!(target.field("Internal"), Some(&PlainValue::string("")));

    let options = FlexOptions::with_options([FlexOption::NoIgnoredFieldNames]).unwrap();
    let (target, _) = lower_into(&source, &api, &options);
    assert_eq!(
        target
            .field("Tags")
            .and_then(PlainValue::entries)
            .and_then(|e| e.get("env"))
            .and_then(PlainValue::as_str),
        Some("prod")
    );
    assert_eq!(target.field("Internal"), Some(&PlainValue::string("")));
}

#[test]
fn test_field_name_prefix() {
    let model = ObjectType::builder("BucketModel")
        .field("Name", TaggedType::String)
        .field("Region", TaggedType::String)
        .build()
        .unwrap();
    let api = StructType::builder("Bucket")
        .field("BucketName", PlainType::String)
        .field("Region", PlainType::String)
        .build()
        .unwrap();
    let options =
        FlexOptions::with_options([FlexOption::FieldNamePrefix("Bucket".to_string())]).unwrap();
    let source = TaggedValue::object(
        &model,
        [("Name", TaggedValue::string("logs")), ("Region", TaggedValue::string("eu"))],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &options);
    assert!(diags.is_empty());
    assert_eq!(target.field("BucketName"), Some(&PlainValue::string("logs")));
    assert_eq!(target.field("Region"), Some(&PlainValue::string("eu")));
}

#[test]
fn test_embedded_fields_are_promoted() {
    let common = ObjectType::builder("Common")
        .field("Region", TaggedType::String)
        .build()
        .unwrap();
    let model = ObjectType::builder("Model")
        .embed(&common)
        .field("Name", TaggedType::String)
        .build()
        .unwrap();
    let common_api = StructType::builder("CommonApi")
        .field("Region", PlainType::reference(PlainType::String))
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .embed_ref(&common_api)
        .field("Name", PlainType::String)
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            (
                "Common",
                TaggedValue::object(&common, [("Region", TaggedValue::string("us-west-2"))])
                    .unwrap(),
            ),
            ("Name", TaggedValue::string("n")),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty());
    assert_eq!(
        target
            .field("CommonApi")
            .and_then(|c| c.field("Region"))
            .and_then(PlainValue::as_str),
        Some("us-west-2")
    );
}

#[test]
fn test_nested_object_into_reference() {
    let logging = ObjectType::builder("Logging")
        .field("Bucket", TaggedType::String)
        .build()
        .unwrap();
    let model = ObjectType::builder("Distribution")
        .field("Logging", TaggedType::object(&logging))
        .field("Origin", TaggedType::list(TaggedType::object(&logging)))
        .build()
        .unwrap();
    let logging_api = StructType::builder("LoggingConfig")
        .field("Bucket", PlainType::reference(PlainType::String))
        .build()
        .unwrap();
    let api = StructType::builder("Distribution")
        .field("Logging", PlainType::reference(PlainType::structure(&logging_api)))
        .field("Origin", PlainType::reference(PlainType::structure(&logging_api)))
        .build()
        .unwrap();
    let entry = TaggedValue::object(&logging, [("Bucket", TaggedValue::string("b"))]).unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("Logging", entry.clone()),
            ("Origin", TaggedValue::list(TaggedType::object(&logging), [entry])),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty(), "{}", diags.report());
    for field in ["Logging", "Origin"] {
        assert_eq!(
            target
                .field(field)
                .and_then(|l| l.field("Bucket"))
                .and_then(PlainValue::as_str),
            Some("b")
        );
    }
}

#[test]
fn test_enum_timestamp_and_bytes() {
    let status = EnumType::new("Status", ["ENABLED", "DISABLED"]);
    let model = ObjectType::builder("Model")
        .field("Status", TaggedType::Enum(status.clone()))
        .field("CreatedAt", TaggedType::Opaque(OpaqueKind::Timestamp))
        .field("Body", TaggedType::String)
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("Status", PlainType::Enum(status.clone()))
        .field("CreatedAt", PlainType::reference(PlainType::Timestamp))
        .field("Body", PlainType::Bytes)
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("Status", TaggedValue::enum_value(&status, "ENABLED")),
            ("CreatedAt", TaggedValue::opaque(OpaqueKind::Timestamp, "2024-03-01T12:00:00Z")),
            ("Body", TaggedValue::string("hi")),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.is_empty(), "{}", diags.report());
    assert_eq!(target.field("Status").and_then(PlainValue::as_str), Some("ENABLED"));
    assert_eq!(
        target.field("Body"),
        Some(&PlainValue::Bytes(Some(b"hi".to_vec())))
    );
    let created = match target.field("CreatedAt").and_then(PlainValue::concrete) {
        Some(PlainValue::Timestamp(at)) => at.to_rfc3339(),
        other => panic!("unexpected value {other:?}"),
    };
    assert_eq!(created, "2024-03-01T12:00:00+00:00");
}

#[test]
fn test_bad_timestamp_is_reported() {
    let model = ObjectType::builder("Model")
        .field("CreatedAt", TaggedType::Opaque(OpaqueKind::Timestamp))
        .field("Name", TaggedType::String)
        .build()
        .unwrap();
    let api = StructType::builder("Api")
        .field("CreatedAt", PlainType::Timestamp)
        .field("Name", PlainType::String)
        .build()
        .unwrap();
    let source = TaggedValue::object(
        &model,
        [
            ("CreatedAt", TaggedValue::opaque(OpaqueKind::Timestamp, "yesterday")),
            ("Name", TaggedValue::string("n")),
        ],
    )
    .unwrap();

    let (target, diags) = lower_into(&source, &api, &FlexOptions::default());
    assert!(diags.contains_code(DiagnosticCode::SourceNotConvertible));
    assert_eq!(target.field("Name"), Some(&PlainValue::string("n")));
}

#[test]
fn test_top_level_collection() {
    let mut target = PlainValue::some(PlainValue::zero(&PlainType::slice(PlainType::Int64)));
    let source = TaggedValue::list(
        TaggedType::Int64,
        [TaggedValue::int64(1), TaggedValue::int64(2)],
    );

    let diags = lower(Some(&source), Some(&mut target), &FlexOptions::default());
    assert!(diags.is_empty());
    assert_eq!(
        target.items(),
        Some(&[PlainValue::Int64(1), PlainValue::Int64(2)][..])
    );
}

#[test]
fn test_top_level_requires_reference_target() {
    let api = string_api();
    let mut target: PlainValue = StructValue::zero(&api).into();
    let source = TaggedValue::empty_object(&string_model(""));

    init_tracing();
    let diags = lower(Some(&source), Some(&mut target), &FlexOptions::default());
    assert_eq!(diags.len(), 1);
    assert!(diags.contains_code(DiagnosticCode::NilOrNonReferenceTarget));
    assert_eq!(target, StructValue::zero(&api).into());
}
