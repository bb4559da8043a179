//! Logical type processors
//!
//! A logical type refines a base primitive (e.g. int-as-date) with
//! dedicated coercion. Processors are stateless strategies keyed by the
//! schema's `logicalType` tag; a [`LogicalTypeRegistry`] is built once per
//! converter and never mutated afterward.
//!
//! Numeric semantics are deliberate and sometimes lossy:
//!
//! | tag | base | forward | notes |
//! |---|---|---|---|
//! | `decimal` | string | decimal → string | no scale/precision enforcement |
//! | `date` | int | days since 1970-01-01 | |
//! | `time-millis` | int | whole ms since midnight | sub-ms truncated |
//! | `time-micros` | long | µs since midnight | exact |
//! | `timestamp-millis` | long | ms since UTC epoch | sub-ms truncated |
//! | `timestamp-micros` | long | µs since UTC epoch | exact |
//!
//! Timestamps localize naive inputs to the process-local zone before
//! converting; the original zone is lost on read-back. Times discard the
//! day component, so values past 24h wrap silently.

use chrono::{Datelike, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::{NodeRef, SchemaKind};
use crate::value::Value;

const MICROS_PER_DAY: i64 = 86_400_000_000;
const MICROS_PER_HOUR: i64 = 3_600_000_000;
const MICROS_PER_MINUTE: i64 = 60_000_000;
const MICROS_PER_SECOND: i64 = 1_000_000;

/// A pure strategy coercing between a native value and its base-kind wire
/// representation
pub trait LogicalTypeProcessor: Send + Sync {
    /// Whether this processor applies to the given base schema
    fn can_convert(&self, base: NodeRef<'_>) -> bool;

    /// Whether the native value has the runtime kind this processor expects
    fn validate(&self, value: &Value) -> bool;

    /// Native value → base-kind value (the forward, write-side coercion)
    fn convert(&self, base: NodeRef<'_>, value: &Value) -> Result<Value>;

    /// Decoded base-kind value → native value (the read-side coercion)
    fn convert_back(&self, writer: NodeRef<'_>, reader: NodeRef<'_>, value: Value)
        -> Result<Value>;

    /// Whether this processor resolves the given writer/reader pair
    fn does_match(&self, writer: NodeRef<'_>, reader: NodeRef<'_>) -> bool;
}

/// Immutable tag → processor map
#[derive(Clone)]
pub struct LogicalTypeRegistry {
    processors: HashMap<String, Arc<dyn LogicalTypeProcessor>>,
}

impl LogicalTypeRegistry {
    /// A registry with no processors
    pub fn empty() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Add a processor under a tag, builder-style
    pub fn with(
        mut self,
        tag: impl Into<String>,
        processor: Arc<dyn LogicalTypeProcessor>,
    ) -> Self {
        self.processors.insert(tag.into(), processor);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn LogicalTypeProcessor>> {
        self.processors.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.processors.contains_key(tag)
    }
}

/// The six standard processors
impl Default for LogicalTypeRegistry {
    fn default() -> Self {
        Self::empty()
            .with("decimal", Arc::new(DecimalProcessor))
            .with("date", Arc::new(DateProcessor))
            .with("time-millis", Arc::new(TimeMillisProcessor))
            .with("time-micros", Arc::new(TimeMicrosProcessor))
            .with("timestamp-millis", Arc::new(TimestampMillisProcessor))
            .with("timestamp-micros", Arc::new(TimestampMicrosProcessor))
    }
}

impl fmt::Debug for LogicalTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("LogicalTypeRegistry")
            .field("tags", &tags)
            .finish()
    }
}

fn is_numeric_kind(node: NodeRef<'_>) -> bool {
    matches!(
        node.kind(),
        SchemaKind::Int | SchemaKind::Long | SchemaKind::Float | SchemaKind::Double
    )
}

fn require_i64(value: &Value, expected: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::type_mismatch(expected, value.kind_name()))
}

/// `decimal`: string-backed and permissive, no scale/precision enforcement
pub struct DecimalProcessor;

impl LogicalTypeProcessor for DecimalProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::String)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(
            value,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) | Value::Decimal(_)
        )
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        let text = match value {
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            other => return Err(Error::type_mismatch("decimal", other.kind_name())),
        };
        Ok(Value::String(text))
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        match value {
            Value::String(s) => Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map(Value::Decimal)
                .map_err(|_| Error::type_mismatch("decimal string", "string")),
            other => Err(Error::type_mismatch("string", other.kind_name())),
        }
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        matches!(writer.kind(), SchemaKind::String)
    }
}

/// `date`: day offset from 1970-01-01 over an int base
pub struct DateProcessor;

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date")
}

impl LogicalTypeProcessor for DateProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::Int)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::Date(_))
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        match value {
            Value::Date(date) => {
                let days = date.signed_duration_since(epoch_date()).num_days();
                let days = i32::try_from(days)
                    .map_err(|_| Error::type_mismatch("date in int day range", "date"))?;
                Ok(Value::Int(days))
            }
            other => Err(Error::type_mismatch("date", other.kind_name())),
        }
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        let days = require_i64(&value, "day offset")?;
        epoch_date()
            .checked_add_signed(chrono::Duration::days(days))
            .map(Value::Date)
            .ok_or_else(|| Error::type_mismatch("day offset in date range", value.kind_name()))
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        is_numeric_kind(writer)
    }
}

fn time_to_micros(time: &NaiveTime) -> i64 {
    let seconds =
        (i64::from(time.hour()) * 60 + i64::from(time.minute())) * 60 + i64::from(time.second());
    seconds * MICROS_PER_SECOND + i64::from(time.nanosecond() / 1_000)
}

// Day component is discarded; values past 24h wrap silently.
fn micros_to_time(value: i64) -> Result<NaiveTime> {
    let in_day = value.rem_euclid(MICROS_PER_DAY);
    let hours = in_day / MICROS_PER_HOUR;
    let rem = in_day % MICROS_PER_HOUR;
    let minutes = rem / MICROS_PER_MINUTE;
    let rem = rem % MICROS_PER_MINUTE;
    let seconds = rem / MICROS_PER_SECOND;
    let micros = rem % MICROS_PER_SECOND;
    NaiveTime::from_hms_micro_opt(hours as u32, minutes as u32, seconds as u32, micros as u32)
        .ok_or_else(|| Error::type_mismatch("time-of-day offset", "long"))
}

/// `time-micros`: microseconds since midnight over a long base
pub struct TimeMicrosProcessor;

impl LogicalTypeProcessor for TimeMicrosProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::Long)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::Time(_))
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        match value {
            Value::Time(time) => Ok(Value::Long(time_to_micros(time))),
            other => Err(Error::type_mismatch("time", other.kind_name())),
        }
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        let micros = require_i64(&value, "microsecond offset")?;
        micros_to_time(micros).map(Value::Time)
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        is_numeric_kind(writer)
    }
}

/// `time-millis`: whole milliseconds since midnight over an int base;
/// sub-millisecond precision is truncated by design
pub struct TimeMillisProcessor;

impl LogicalTypeProcessor for TimeMillisProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::Int)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::Time(_))
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        match value {
            Value::Time(time) => {
                let millis = time_to_micros(time).div_euclid(1_000);
                Ok(Value::Int(millis as i32))
            }
            other => Err(Error::type_mismatch("time", other.kind_name())),
        }
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        let millis = require_i64(&value, "millisecond offset")?;
        micros_to_time(millis * 1_000).map(Value::Time)
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        is_numeric_kind(writer)
    }
}

// Naive inputs are localized to the process-local zone; a bare date counts
// as local midnight. The original zone is lost on read-back.
fn localize_to_epoch_micros(value: &Value) -> Result<i64> {
    let naive: NaiveDateTime = match value {
        Value::DateTime(dt) => *dt,
        Value::Date(d) => NaiveDateTime::new(
            NaiveDate::from_ymd_opt(d.year(), d.month(), d.day())
                .ok_or_else(|| Error::type_mismatch("datetime", "date"))?,
            NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"),
        ),
        other => return Err(Error::type_mismatch("datetime", other.kind_name())),
    };
    let localized = match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(Error::type_mismatch("resolvable local datetime", "datetime"))
        }
    };
    Ok(localized.timestamp_micros())
}

fn epoch_micros_to_local(micros: i64) -> Result<NaiveDateTime> {
    let utc = Utc
        .timestamp_micros(micros)
        .single()
        .ok_or_else(|| Error::type_mismatch("epoch offset in datetime range", "long"))?;
    Ok(utc.with_timezone(&Local).naive_local())
}

/// `timestamp-micros`: microseconds since the UTC epoch over a long base
pub struct TimestampMicrosProcessor;

impl LogicalTypeProcessor for TimestampMicrosProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::Long)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::DateTime(_) | Value::Date(_))
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        localize_to_epoch_micros(value).map(Value::Long)
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        let micros = require_i64(&value, "epoch microseconds")?;
        epoch_micros_to_local(micros).map(Value::DateTime)
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        is_numeric_kind(writer)
    }
}

/// `timestamp-millis`: milliseconds since the UTC epoch over a long base;
/// sub-millisecond precision is truncated by design
pub struct TimestampMillisProcessor;

impl LogicalTypeProcessor for TimestampMillisProcessor {
    fn can_convert(&self, base: NodeRef<'_>) -> bool {
        matches!(base.kind(), SchemaKind::Long)
    }

    fn validate(&self, value: &Value) -> bool {
        matches!(value, Value::DateTime(_) | Value::Date(_))
    }

    fn convert(&self, _base: NodeRef<'_>, value: &Value) -> Result<Value> {
        localize_to_epoch_micros(value).map(|micros| Value::Long(micros.div_euclid(1_000)))
    }

    fn convert_back(
        &self,
        _writer: NodeRef<'_>,
        _reader: NodeRef<'_>,
        value: Value,
    ) -> Result<Value> {
        let millis = require_i64(&value, "epoch milliseconds")?;
        epoch_micros_to_local(millis * 1_000).map(Value::DateTime)
    }

    fn does_match(&self, writer: NodeRef<'_>, _reader: NodeRef<'_>) -> bool {
        is_numeric_kind(writer)
    }
}
