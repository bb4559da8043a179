//! Logical type tests through the full converter pipeline

use avrojson::{AvroJsonConverter, Error, LogicalTypeRegistry, SchemaBuilder, Value};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

fn logical_converter() -> AvroJsonConverter {
    AvroJsonConverter::builder().use_logical_types(true).build()
}

fn event_schema() -> Arc<avrojson::Schema> {
    let mut b = SchemaBuilder::new();
    let day = b.int();
    let day = b.logical(day, "date");
    let at = b.long();
    let at = b.logical(at, "time-micros");
    let amount = b.string();
    let amount = b.logical(amount, "decimal");
    let event = b.record(
        "Event",
        Some("app"),
        vec![
            b.field("day", day),
            b.field("at", at),
            b.field("amount", amount),
        ],
    );
    b.build(event)
}

#[test]
fn record_with_logical_fields_round_trips() {
    let schema = event_schema();
    let converter = logical_converter();

    let value = Value::Map(
        [
            (
                "day".to_string(),
                Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            ),
            (
                "at".to_string(),
                Value::Time(NaiveTime::from_hms_micro_opt(9, 30, 0, 42).unwrap()),
            ),
            (
                "amount".to_string(),
                Value::Decimal(Decimal::from_str("19.99").unwrap()),
            ),
        ]
        .into_iter()
        .collect(),
    );

    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(
        wire,
        json!({
            "day": 19_783,
            "at": ((9 * 60 + 30) * 60) * 1_000_000_i64 + 42,
            "amount": "19.99",
        })
    );

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);
}

#[test]
fn time_millis_is_lossy_where_micros_is_exact() {
    let mut b = SchemaBuilder::new();
    let millis = b.int();
    let millis = b.logical(millis, "time-millis");
    let micros = b.long();
    let micros = b.logical(micros, "time-micros");
    let rec = b.record(
        "T",
        None,
        vec![b.field("coarse", millis), b.field("fine", micros)],
    );
    let schema = b.build(rec);

    let converter = logical_converter();
    let time = NaiveTime::from_hms_micro_opt(13, 45, 30, 123_456).unwrap();
    let value = Value::Map(
        [
            ("coarse".to_string(), Value::Time(time)),
            ("fine".to_string(), Value::Time(time)),
        ]
        .into_iter()
        .collect(),
    );

    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();

    let truncated = NaiveTime::from_hms_micro_opt(13, 45, 30, 123_000).unwrap();
    assert_eq!(back.field("coarse"), Some(&Value::Time(truncated)));
    assert_eq!(back.field("fine"), Some(&Value::Time(time)));
}

#[test]
fn timestamp_micros_round_trips_through_local_zone() {
    let mut b = SchemaBuilder::new();
    let ts = b.long();
    let ts = b.logical(ts, "timestamp-micros");
    let schema = b.build(ts);

    let converter = logical_converter();
    // Mid-June noon avoids DST fold ambiguity in every zone.
    let dt = NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_micro_opt(12, 0, 0, 7)
        .unwrap();
    let wire = converter
        .to_json_object(&Value::DateTime(dt), Some(schema.root()))
        .unwrap();
    assert!(wire.is_i64());

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, Value::DateTime(dt));
}

#[test]
fn date_value_encodes_as_midnight_timestamp() {
    let mut b = SchemaBuilder::new();
    let ts = b.long();
    let ts = b.logical(ts, "timestamp-millis");
    let schema = b.build(ts);

    let converter = logical_converter();
    let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let wire = converter
        .to_json_object(&Value::Date(date), Some(schema.root()))
        .unwrap();

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(
        back,
        Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
    );
}

#[test]
fn logical_handling_is_off_by_default() {
    let mut b = SchemaBuilder::new();
    let day = b.int();
    let day = b.logical(day, "date");
    let schema = b.build(day);

    let converter = AvroJsonConverter::new();
    // Raw base-kind values pass straight through.
    let wire = converter
        .to_json_object(&Value::Int(19_783), Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!(19_783));
    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, Value::Int(19_783));

    // And a logical native is a type error without a processor.
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert!(matches!(
        converter.to_json_object(&Value::Date(date), Some(schema.root())),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn custom_registry_limits_recognized_tags() {
    let mut b = SchemaBuilder::new();
    let day = b.int();
    let day = b.logical(day, "date");
    let schema = b.build(day);

    let converter = AvroJsonConverter::builder()
        .use_logical_types(true)
        .logical_types(LogicalTypeRegistry::empty())
        .build();
    // The tag is present but unregistered, so the base type governs.
    let back = converter
        .from_json_object(&json!(19_783), Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, Value::Int(19_783));
}

#[test]
fn logical_mismatched_base_falls_through() {
    // date over a long base fails can_convert; the raw value passes
    // through untouched.
    let mut b = SchemaBuilder::new();
    let not_a_date = b.long();
    let not_a_date = b.logical(not_a_date, "date");
    let schema = b.build(not_a_date);

    let converter = logical_converter();
    let wire = converter
        .to_json_object(&Value::Long(5), Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!(5));
}

#[test]
fn decimal_union_with_null_round_trips() {
    let mut b = SchemaBuilder::new();
    let null = b.null();
    let amount = b.string();
    let amount = b.logical(amount, "decimal");
    let u = b.union(vec![null, amount]).unwrap();
    let schema = b.build(u);

    let converter = logical_converter();
    let value = Value::Decimal(Decimal::from_str("-0.5").unwrap());
    let wire = converter
        .to_json_object(&value, Some(schema.root()))
        .unwrap();
    assert_eq!(wire, json!("-0.5"));

    let back = converter
        .from_json_object(&wire, Some(schema.root()), None)
        .unwrap();
    assert_eq!(back, value);

    let null_wire = converter
        .to_json_object(&Value::Null, Some(schema.root()))
        .unwrap();
    assert_eq!(null_wire, json!(null));
}
