//! Native in-memory values
//!
//! [`Value`] is the closed set of runtime shapes the converter binds to a
//! schema: the Avro base kinds plus the logical natives (date, time,
//! datetime, decimal) that processors coerce to and from.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::record::RecordView;

/// A native value convertible to and from the JSON wire form
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    Record(RecordView),
    /// Logical `date` native
    Date(NaiveDate),
    /// Logical `time-millis` / `time-micros` native
    Time(NaiveTime),
    /// Logical `timestamp-millis` / `timestamp-micros` native (naive,
    /// interpreted in the process-local zone)
    DateTime(NaiveDateTime),
    /// Logical `decimal` native
    Decimal(Decimal),
}

impl Value {
    /// Runtime kind name, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Decimal(_) => "decimal",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral view of numeric values; floats truncate
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(*v as i64),
            Value::Double(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// The fullname of the value's own declared schema, when it carries one
    pub fn declared_fullname(&self) -> Option<String> {
        match self {
            Value::Record(view) => Some(view.fullname()),
            _ => None,
        }
    }

    /// Field lookup that works for both raw mappings and record views
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(name),
            Value::Record(view) => view.get(name),
            _ => None,
        }
    }
}

fn map_eq_view(map: &IndexMap<String, Value>, view: &RecordView) -> bool {
    map.len() == view.fields().len()
        && map
            .iter()
            .all(|(k, v)| view.get(k).is_some_and(|other| v == other))
}

// A record view equals a raw mapping with the same contents.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Record(a), Record(b)) => a == b,
            (Map(m), Record(r)) | (Record(r), Map(m)) => map_eq_view(m, r),
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
