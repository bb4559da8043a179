//! Round-trip tests: native value → wire form → native value

use avrojson::{AvroJsonConverter, Error, RecordView, SchemaBuilder, SchemaRef, Value};
use indexmap::indexmap;
use serde_json::json;
use std::sync::Arc;

fn user_type() -> SchemaRef {
    let mut b = SchemaBuilder::new();
    let long = b.long();
    let string = b.string();
    let null = b.null();
    let nickname = b.union(vec![null, string]).unwrap();
    let tags = b.array(string);
    let user = b.record(
        "User",
        Some("app"),
        vec![
            b.field("id", long),
            b.field("name", string),
            b.field("nickname", nickname).with_default(json!(null)),
            b.field("tags", tags).with_default(json!([])),
        ],
    );
    SchemaRef::root(b.build(user))
}

#[test]
fn record_round_trip_with_registered_type() {
    let ty = user_type();
    let converter = AvroJsonConverter::builder()
        .register_type("app.User", ty.clone())
        .build();

    let view = RecordView::construct(
        &converter,
        &ty,
        indexmap! {
            "id".to_string() => Value::Long(7),
            "name".to_string() => Value::from("ada"),
            "nickname".to_string() => Value::from("al"),
            "tags".to_string() => Value::Array(vec![Value::from("ops")]),
        },
    )
    .unwrap();

    let wire = view.to_obj(&converter).unwrap();
    // [null, string] is unambiguous, so the nickname travels unwrapped.
    assert_eq!(
        wire,
        json!({"id": 7, "name": "ada", "nickname": "al", "tags": ["ops"]})
    );

    let back = RecordView::from_obj(&converter, &ty, &wire).unwrap();
    assert_eq!(back, view);
    assert_eq!(back.fullname(), "app.User");
}

#[test]
fn construct_with_empty_mapping_backfills_and_re_encodes() {
    let ty = user_type();
    let converter = AvroJsonConverter::builder()
        .register_type("app.User", ty.clone())
        .build();

    let view = RecordView::construct(&converter, &ty, indexmap! {}).unwrap();
    assert_eq!(view.get("id"), Some(&Value::Long(0)));
    assert_eq!(view.get("name"), Some(&Value::from("")));
    assert_eq!(view.get("nickname"), Some(&Value::Null));
    assert_eq!(view.get("tags"), Some(&Value::Array(vec![])));

    let wire = view.to_obj(&converter).unwrap();
    assert_eq!(
        wire,
        json!({"id": 0, "name": "", "nickname": null, "tags": []})
    );
    // Decoding the defaulted wire form reproduces the same instance.
    let back = RecordView::from_obj(&converter, &ty, &wire).unwrap();
    assert_eq!(back, view);
}

#[test]
fn ambiguous_union_field_round_trips_wrapped() {
    let mut b = SchemaBuilder::new();
    let int = b.int();
    let string = b.string();
    let choice = b.union(vec![int, string]).unwrap();
    let holder = b.record("Holder", None, vec![b.field("v", choice)]);
    let schema = b.build(holder);

    let converter = AvroJsonConverter::new();
    let value = Value::Map(indexmap! { "v".to_string() => Value::from("x") });
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!({"v": {"string": "x"}}));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn array_of_unions_always_wraps_elements() {
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let string = b.string();
    let u = b.union(vec![null, string]).unwrap();
    let arr = b.array(u);
    let schema = b.build(arr);

    let converter = AvroJsonConverter::new();
    let value = Value::Array(vec![Value::from("a"), Value::Null, Value::from("b")]);
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!([{"string": "a"}, null, {"string": "b"}]));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn map_of_union_values_round_trips() {
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let long = b.long();
    let u = b.union(vec![null, long]).unwrap();
    let m = b.map(u);
    let schema = b.build(m);

    let converter = AvroJsonConverter::new();
    let value = Value::Map(indexmap! {
        "a".to_string() => Value::Long(1),
        "b".to_string() => Value::Null,
    });
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!({"a": 1, "b": null}));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn self_referential_record_round_trips() {
    let mut b = SchemaBuilder::new();
    let node = b.declare_record("Node", Some("list"));
    let long = b.long();
    let null = b.null();
    let next = b.union(vec![null, node]).unwrap();
    b.define_record(node, vec![b.field("value", long), b.field("next", next)]);
    let schema: Arc<avrojson::Schema> = b.build(node);
    let ty = SchemaRef::root(schema);

    let converter = AvroJsonConverter::builder()
        .register_type("list.Node", ty.clone())
        .build();

    let tail = RecordView::construct(
        &converter,
        &ty,
        indexmap! { "value".to_string() => Value::Long(2) },
    )
    .unwrap();
    let head = RecordView::construct(
        &converter,
        &ty,
        indexmap! {
            "value".to_string() => Value::Long(1),
            "next".to_string() => Value::Record(tail),
        },
    )
    .unwrap();

    let wire = head.to_obj(&converter).unwrap();
    // [null, Node] is unambiguous at the top level of a field.
    assert_eq!(
        wire,
        json!({"value": 1, "next": {"value": 2, "next": null}})
    );

    let back = RecordView::from_obj(&converter, &ty, &wire).unwrap();
    assert_eq!(back, head);
    match back.get("next") {
        Some(Value::Record(inner)) => {
            assert_eq!(inner.fullname(), "list.Node");
            assert_eq!(inner.get("value"), Some(&Value::Long(2)));
        }
        other => panic!("unexpected next value: {other:?}"),
    }
}

#[test]
fn tuple_union_mode_round_trips_records() {
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let string = b.string();
    let u = b.union(vec![null, string]).unwrap();
    let holder = b.record("Holder", None, vec![b.field("v", u)]);
    let schema = b.build(holder);

    let converter = AvroJsonConverter::new().with_tuple_union(true);
    let value = Value::Map(indexmap! { "v".to_string() => Value::from("x") });
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    // Tuple mode never compacts, even unambiguous unions.
    assert_eq!(wire, json!({"v": ["string", "x"]}));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn wire_value_no_union_branch_accepts_is_rejected() {
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let int = b.int();
    let u = b.union(vec![null, int]).unwrap();
    let schema = b.build(u);

    let converter = AvroJsonConverter::new();
    let err = converter
        .from_json_object(&json!("x"), Some(schema.root()), None)
        .unwrap_err();
    match err {
        Error::NoMatchingUnionBranch(kind) => assert_eq!(kind, "string"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn mistyped_value_reports_type_mismatch() {
    let mut b = SchemaBuilder::new();
    let int = b.int();
    let schema = b.build(int);

    let converter = AvroJsonConverter::new();
    let err = converter
        .to_json_object(&Value::from("x"), Some(schema.root()))
        .unwrap_err();
    match err {
        Error::TypeMismatch { expected, actual } => {
            assert_eq!(expected, "int");
            assert_eq!(actual, "string");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A union none of whose branches accepts the value fails the same way
    // on the write side, before branch selection.
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let int = b.int();
    let u = b.union(vec![null, int]).unwrap();
    let schema = b.build(u);
    assert!(matches!(
        converter.to_json_object(&Value::from("x"), Some(schema.root())),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn enum_and_fixed_round_trip() {
    let mut b = SchemaBuilder::new();
    let suit = b.enumeration("Suit", None, &["SPADES", "HEARTS"]);
    let checksum = b.fixed("Checksum", None, 4);
    let rec = b.record(
        "Card",
        None,
        vec![b.field("suit", suit), b.field("sum", checksum)],
    );
    let schema = b.build(rec);

    let converter = AvroJsonConverter::new();
    let value = Value::Map(indexmap! {
        "suit".to_string() => Value::from("HEARTS"),
        "sum".to_string() => Value::Bytes(b"abcd".to_vec()),
    });
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!({"suit": "HEARTS", "sum": "abcd"}));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    match back {
        Value::Map(map) => {
            assert_eq!(map["suit"], Value::from("HEARTS"));
            assert_eq!(map["sum"], Value::Bytes(b"abcd".to_vec()));
        }
        other => panic!("unexpected value: {other:?}"),
    }
}
