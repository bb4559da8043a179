//! JSON conversion over schema trees
//!
//! [`AvroJsonConverter`] orchestrates validate / serialize / deserialize for
//! native values against writer and (possibly different) reader schemas. It
//! carries immutable configuration only (logical type registry, registered
//! record types, tuple-union mode) and is safe to share across threads.
//!
//! # Example
//!
//! ```rust,ignore
//! use avrojson::{AvroJsonConverter, SchemaBuilder, Value};
//!
//! let mut b = SchemaBuilder::new();
//! let int = b.int();
//! let point = b.record("Point", None, vec![b.field("x", int), b.field("y", int)]);
//! let schema = b.build(point);
//!
//! let converter = AvroJsonConverter::new();
//! let wire = converter.to_json_object(&value, Some(schema.root()))?;
//! let back = converter.from_json_object(&wire, Some(schema.root()), None)?;
//! ```

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::logical::LogicalTypeRegistry;
use crate::record::RecordView;
use crate::schema::{effective_type, schemas_match, Field, Handle, NodeRef, SchemaKind, SchemaRef};
use crate::value::Value;

/// Converter between native values and the JSON-compatible wire form
///
/// Configuration is fixed at construction; [`AvroJsonConverter::with_tuple_union`]
/// derives a new converter rather than mutating in place.
#[derive(Debug, Clone)]
pub struct AvroJsonConverter {
    use_logical_types: bool,
    logical_types: LogicalTypeRegistry,
    schema_types: Arc<HashMap<String, SchemaRef>>,
    tuple_union: bool,
}

/// Builder for [`AvroJsonConverter`]
#[derive(Debug)]
pub struct AvroJsonConverterBuilder {
    use_logical_types: bool,
    logical_types: LogicalTypeRegistry,
    schema_types: HashMap<String, SchemaRef>,
    tuple_union: bool,
}

impl Default for AvroJsonConverterBuilder {
    fn default() -> Self {
        Self {
            use_logical_types: false,
            logical_types: LogicalTypeRegistry::default(),
            schema_types: HashMap::new(),
            tuple_union: false,
        }
    }
}

impl AvroJsonConverterBuilder {
    /// Enable logical-type coercion (disabled by default)
    pub fn use_logical_types(mut self, enable: bool) -> Self {
        self.use_logical_types = enable;
        self
    }

    /// Replace the logical type registry
    pub fn logical_types(mut self, registry: LogicalTypeRegistry) -> Self {
        self.logical_types = registry;
        self
    }

    /// Register a record type so decoded mappings instantiate as
    /// [`RecordView`]s of that type
    pub fn register_type(mut self, fullname: impl Into<String>, ty: SchemaRef) -> Self {
        self.schema_types.insert(fullname.into(), ty);
        self
    }

    /// Encode unions as `[discriminator, value]` pairs instead of
    /// single-key objects
    pub fn tuple_union(mut self, enable: bool) -> Self {
        self.tuple_union = enable;
        self
    }

    pub fn build(self) -> AvroJsonConverter {
        AvroJsonConverter {
            use_logical_types: self.use_logical_types,
            logical_types: self.logical_types,
            schema_types: Arc::new(self.schema_types),
            tuple_union: self.tuple_union,
        }
    }
}

impl Default for AvroJsonConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn primitive_validates(kind: &SchemaKind, datum: &Value) -> bool {
    match (kind, datum) {
        (SchemaKind::Null, Value::Null) => true,
        (SchemaKind::Boolean, Value::Boolean(_)) => true,
        (SchemaKind::Int, Value::Int(_)) => true,
        (SchemaKind::Int, Value::Long(v)) => i32::try_from(*v).is_ok(),
        (SchemaKind::Long, Value::Int(_) | Value::Long(_)) => true,
        (
            SchemaKind::Float | SchemaKind::Double,
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_),
        ) => true,
        (SchemaKind::String, Value::String(_)) => true,
        (SchemaKind::Bytes, Value::Bytes(_)) => true,
        (SchemaKind::Fixed { size }, Value::Bytes(b)) => b.len() == *size,
        (SchemaKind::Fixed { size }, Value::String(s)) => s.len() == *size,
        (SchemaKind::Enum { symbols }, Value::String(s)) => symbols.iter().any(|sym| sym == s),
        _ => false,
    }
}

/// A union needs no discriminator when at most one non-null branch could
/// match. Enums conflict with strings, so an enum branch is only
/// unambiguous paired with nothing but null.
fn is_unambiguous_union(union: NodeRef<'_>, branches: &[Handle]) -> bool {
    let has_enum = branches
        .iter()
        .any(|b| matches!(union.at(*b).kind(), SchemaKind::Enum { .. }));
    if has_enum {
        return branches.len() == 2
            && branches
                .iter()
                .any(|b| matches!(union.at(*b).kind(), SchemaKind::Null));
    }
    branches
        .iter()
        .filter(|b| !matches!(union.at(**b).kind(), SchemaKind::Null))
        .count()
        <= 1
}

impl AvroJsonConverter {
    /// A converter with default configuration: logical types disabled,
    /// no registered record types, single-key-object unions
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> AvroJsonConverterBuilder {
        AvroJsonConverterBuilder::default()
    }

    /// Derive a converter with tuple-union mode switched, sharing all other
    /// configuration
    pub fn with_tuple_union(&self, enable: bool) -> Self {
        Self {
            use_logical_types: self.use_logical_types,
            logical_types: self.logical_types.clone(),
            schema_types: Arc::clone(&self.schema_types),
            tuple_union: enable,
        }
    }

    /// Registered record type lookup
    pub fn schema_type(&self, fullname: &str) -> Option<&SchemaRef> {
        self.schema_types.get(fullname)
    }

    /// Recursive structural check of a native value against a schema
    pub fn validate(&self, schema: NodeRef<'_>, datum: &Value) -> bool {
        if self.use_logical_types {
            if let Some(tag) = schema.logical_tag() {
                if let Some(processor) = self.logical_types.get(tag) {
                    // A tag over the wrong base kind falls through to the
                    // base type, same as an unregistered tag.
                    if processor.can_convert(schema) {
                        return processor.validate(datum);
                    }
                }
            }
        }
        match schema.kind() {
            SchemaKind::Array { items } => match datum {
                Value::Array(els) => els.iter().all(|e| self.validate(schema.at(*items), e)),
                _ => false,
            },
            SchemaKind::Map { values } => match datum {
                Value::Map(map) => map.values().all(|v| self.validate(schema.at(*values), v)),
                _ => false,
            },
            SchemaKind::Union { branches } => self.validate_union(schema, branches, datum),
            SchemaKind::Record { fields } => match datum {
                Value::Map(_) | Value::Record(_) => fields.iter().all(|f| {
                    let value = datum.field(&f.name).unwrap_or(&Value::Null);
                    self.validate(schema.at(f.ty), value)
                }),
                _ => false,
            },
            // In JSON wire form bytes travel as text.
            SchemaKind::Bytes if !self.tuple_union && matches!(datum, Value::String(_)) => true,
            kind => primitive_validates(kind, datum),
        }
    }

    fn validate_union(&self, schema: NodeRef<'_>, branches: &[Handle], datum: &Value) -> bool {
        // A value exposing its own declared schema short-circuits to the
        // branch with the matching fullname.
        if let Some(declared) = datum.declared_fullname() {
            for b in branches {
                let branch = schema.at(*b);
                if branch.fullname() == declared {
                    return self.validate(branch, datum);
                }
            }
        }
        // Already-wrapped forms: {discriminator: value} or, in tuple mode,
        // [discriminator, value].
        let tagged: Option<(&str, &Value)> = if self.tuple_union {
            match datum {
                Value::Array(items) if items.len() == 2 => match &items[0] {
                    Value::String(tag) => Some((tag.as_str(), &items[1])),
                    _ => None,
                },
                _ => None,
            }
        } else {
            match datum {
                Value::Map(map) if map.len() == 1 => {
                    map.iter().next().map(|(k, v)| (k.as_str(), v))
                }
                _ => None,
            }
        };
        if let Some((tag, inner)) = tagged {
            for b in branches {
                let branch = schema.at(*b);
                if branch.fullname() == tag && self.validate(branch, inner) {
                    return true;
                }
            }
        }
        branches.iter().any(|b| self.validate(schema.at(*b), datum))
    }

    /// Encode a native value as its JSON wire form
    ///
    /// The writer's schema may be omitted when the value carries its own
    /// declared schema (a [`RecordView`]); otherwise this fails with
    /// [`Error::SchemaInference`].
    pub fn to_json_object<'a>(
        &self,
        datum: &'a Value,
        writer: Option<NodeRef<'a>>,
    ) -> Result<JsonValue> {
        let writer = match writer {
            Some(writer) => writer,
            None => match datum {
                Value::Record(view) => view.schema(),
                _ => return Err(Error::SchemaInference),
            },
        };
        trace!(schema = %writer.fullname(), "encoding value to wire form");
        if !self.validate(writer, datum) {
            return Err(Error::type_mismatch(writer.fullname(), datum.kind_name()));
        }
        self.encode(datum, writer, false)
    }

    fn encode(&self, datum: &Value, writer: NodeRef<'_>, in_array: bool) -> Result<JsonValue> {
        let converted;
        let mut datum = datum;
        if self.use_logical_types {
            if let Some(tag) = writer.logical_tag() {
                // An unregistered tag falls through to the raw base type.
                if let Some(processor) = self.logical_types.get(tag) {
                    if processor.can_convert(writer) {
                        if !processor.validate(datum) {
                            return Err(Error::type_mismatch(
                                format!("{tag} logical value"),
                                datum.kind_name(),
                            ));
                        }
                        converted = processor.convert(writer, datum)?;
                        datum = &converted;
                    }
                }
            }
        }

        match writer.kind() {
            SchemaKind::Null => Ok(JsonValue::Null),
            SchemaKind::Boolean => match datum {
                Value::Boolean(b) => Ok(JsonValue::Bool(*b)),
                other => Err(Error::type_mismatch("boolean", other.kind_name())),
            },
            SchemaKind::Int | SchemaKind::Long => match datum {
                Value::Int(v) => Ok(JsonValue::Number((*v).into())),
                Value::Long(v) => Ok(JsonValue::Number((*v).into())),
                other => Err(Error::type_mismatch(writer.kind_name(), other.kind_name())),
            },
            SchemaKind::Float | SchemaKind::Double => {
                let float = match datum {
                    Value::Int(v) => f64::from(*v),
                    Value::Long(v) => *v as f64,
                    Value::Float(v) => f64::from(*v),
                    Value::Double(v) => *v,
                    other => {
                        return Err(Error::type_mismatch(writer.kind_name(), other.kind_name()))
                    }
                };
                Number::from_f64(float)
                    .map(JsonValue::Number)
                    .ok_or_else(|| Error::type_mismatch("finite number", datum.kind_name()))
            }
            SchemaKind::String | SchemaKind::Enum { .. } => match datum {
                Value::String(s) => Ok(JsonValue::String(s.clone())),
                other => Err(Error::type_mismatch(writer.kind_name(), other.kind_name())),
            },
            SchemaKind::Bytes | SchemaKind::Fixed { .. } => match datum {
                Value::Bytes(b) => String::from_utf8(b.clone())
                    .map(JsonValue::String)
                    .map_err(|_| Error::type_mismatch("utf-8 text bytes", "bytes")),
                Value::String(s) => Ok(JsonValue::String(s.clone())),
                other => Err(Error::type_mismatch(writer.kind_name(), other.kind_name())),
            },
            SchemaKind::Array { items } => match datum {
                Value::Array(els) => {
                    let items = writer.at(*items);
                    let encoded: Result<Vec<JsonValue>> =
                        els.iter().map(|e| self.encode(e, items, true)).collect();
                    Ok(JsonValue::Array(encoded?))
                }
                other => Err(Error::type_mismatch("array", other.kind_name())),
            },
            SchemaKind::Map { values } => match datum {
                Value::Map(map) => {
                    let values = writer.at(*values);
                    let mut obj = JsonMap::with_capacity(map.len());
                    for (key, value) in map {
                        obj.insert(key.clone(), self.encode(value, values, false)?);
                    }
                    Ok(JsonValue::Object(obj))
                }
                other => Err(Error::type_mismatch("map", other.kind_name())),
            },
            SchemaKind::Record { fields } => self.record_to_json(datum, writer, fields),
            SchemaKind::Union { branches } => {
                self.union_to_json(datum, writer, branches, in_array)
            }
        }
    }

    fn record_to_json(
        &self,
        datum: &Value,
        writer: NodeRef<'_>,
        fields: &[Field],
    ) -> Result<JsonValue> {
        let mut obj = JsonMap::with_capacity(fields.len());
        for field in fields {
            let ty = writer.at(field.ty);
            let backfill;
            let value = match datum.field(&field.name) {
                Some(value) => value,
                None => {
                    backfill = self.resolved_default(ty, field.default.as_ref())?;
                    &backfill
                }
            };
            obj.insert(field.name.clone(), self.encode(value, ty, false)?);
        }
        Ok(JsonValue::Object(obj))
    }

    fn union_to_json(
        &self,
        datum: &Value,
        union: NodeRef<'_>,
        branches: &[Handle],
        in_array: bool,
    ) -> Result<JsonValue> {
        let declared = datum.declared_fullname();
        let mut chosen: Option<NodeRef<'_>> = None;
        for b in branches {
            let branch = union.at(*b);
            if let Some(declared) = &declared {
                if &branch.fullname() == declared {
                    chosen = Some(branch);
                    break;
                }
            }
            if self.validate(branch, datum) {
                // A validating boolean branch wins immediately so a later
                // numeric or string branch cannot shadow it.
                if matches!(branch.kind(), SchemaKind::Boolean) {
                    chosen = Some(branch);
                    break;
                }
                if chosen.is_none() {
                    chosen = Some(branch);
                }
            }
        }
        let branch =
            chosen.ok_or_else(|| Error::NoMatchingUnionBranch(datum.kind_name().to_string()))?;
        if matches!(branch.kind(), SchemaKind::Null) {
            return Ok(JsonValue::Null);
        }

        let output = self.encode(datum, branch, false)?;
        // Arrays with unions inside must always name the branch.
        if !self.tuple_union && !in_array && is_unambiguous_union(union, branches) {
            return Ok(output);
        }
        if self.tuple_union {
            Ok(JsonValue::Array(vec![
                JsonValue::String(branch.fullname()),
                output,
            ]))
        } else {
            let mut obj = JsonMap::with_capacity(1);
            obj.insert(branch.fullname(), output);
            Ok(JsonValue::Object(obj))
        }
    }

    /// Decode a wire value into its native form
    ///
    /// Either schema defaults to the other when omitted; supplying neither
    /// fails with [`Error::AtLeastOneSchemaRequired`].
    pub fn from_json_object(
        &self,
        json: &JsonValue,
        writer: Option<NodeRef<'_>>,
        reader: Option<NodeRef<'_>>,
    ) -> Result<Value> {
        let (writer, reader) = match (writer, reader) {
            (Some(writer), Some(reader)) => (writer, reader),
            (Some(writer), None) => (writer, writer),
            (None, Some(reader)) => (reader, reader),
            (None, None) => return Err(Error::AtLeastOneSchemaRequired),
        };
        trace!(
            writer = %writer.fullname(),
            reader = %reader.fullname(),
            "decoding wire value"
        );
        if !schemas_match(writer, reader) {
            return Err(Error::SchemaMismatch {
                writer: writer.fullname(),
                reader: reader.fullname(),
            });
        }
        self.decode(json, writer, reader)
    }

    fn decode(&self, json: &JsonValue, writer: NodeRef<'_>, reader: NodeRef<'_>) -> Result<Value> {
        // Writer wrote a concrete type but the reader models it as a union:
        // resolve to the first structurally compatible reader branch.
        if !writer.is_union() && reader.is_union() {
            if let SchemaKind::Union { branches } = reader.kind() {
                for b in branches {
                    let branch = reader.at(*b);
                    if schemas_match(writer, branch) {
                        return self.decode(json, writer, branch);
                    }
                }
            }
            return Err(Error::SchemaMismatch {
                writer: writer.fullname(),
                reader: reader.fullname(),
            });
        }

        let result = match writer.kind() {
            SchemaKind::Null => match json {
                JsonValue::Null => Value::Null,
                other => return Err(Error::type_mismatch("null", json_kind(other))),
            },
            SchemaKind::Boolean
            | SchemaKind::Int
            | SchemaKind::Long
            | SchemaKind::Float
            | SchemaKind::Double
            | SchemaKind::String
            | SchemaKind::Bytes => self.primitive_from_json(json, writer, reader)?,
            SchemaKind::Fixed { .. } => match json {
                JsonValue::String(s) => Value::Bytes(s.clone().into_bytes()),
                other => return Err(Error::type_mismatch("fixed", json_kind(other))),
            },
            SchemaKind::Enum { .. } => match json {
                JsonValue::String(s) => Value::String(s.clone()),
                other => return Err(Error::type_mismatch("enum", json_kind(other))),
            },
            SchemaKind::Array { items } => {
                let r_items = match reader.kind() {
                    SchemaKind::Array { items } => reader.at(*items),
                    _ => {
                        return Err(Error::SchemaMismatch {
                            writer: writer.fullname(),
                            reader: reader.fullname(),
                        })
                    }
                };
                match json {
                    JsonValue::Array(els) => {
                        let decoded: Result<Vec<Value>> = els
                            .iter()
                            .map(|e| self.decode(e, writer.at(*items), r_items))
                            .collect();
                        Value::Array(decoded?)
                    }
                    other => return Err(Error::type_mismatch("array", json_kind(other))),
                }
            }
            SchemaKind::Map { values } => {
                let r_values = match reader.kind() {
                    SchemaKind::Map { values } => reader.at(*values),
                    _ => {
                        return Err(Error::SchemaMismatch {
                            writer: writer.fullname(),
                            reader: reader.fullname(),
                        })
                    }
                };
                match json {
                    JsonValue::Object(obj) => {
                        let mut map = IndexMap::with_capacity(obj.len());
                        for (key, value) in obj {
                            map.insert(
                                key.clone(),
                                self.decode(value, writer.at(*values), r_values)?,
                            );
                        }
                        Value::Map(map)
                    }
                    other => return Err(Error::type_mismatch("map", json_kind(other))),
                }
            }
            SchemaKind::Union { .. } => self.union_from_json(json, writer, reader)?,
            SchemaKind::Record { .. } => self.record_from_json(json, writer, reader)?,
        };

        if self.use_logical_types {
            if let Some(tag) = reader.logical_tag() {
                if let Some(processor) = self.logical_types.get(tag) {
                    if processor.does_match(writer, reader) {
                        return processor.convert_back(writer, reader, result);
                    }
                }
            }
        }
        Ok(result)
    }

    fn primitive_from_json(
        &self,
        json: &JsonValue,
        writer: NodeRef<'_>,
        reader: NodeRef<'_>,
    ) -> Result<Value> {
        let value = match writer.kind() {
            SchemaKind::Boolean => match json {
                JsonValue::Bool(b) => Value::Boolean(*b),
                other => return Err(Error::type_mismatch("boolean", json_kind(other))),
            },
            SchemaKind::Int => {
                let v = json
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| Error::type_mismatch("int", json_kind(json)))?;
                Value::Int(v)
            }
            SchemaKind::Long => {
                let v = json
                    .as_i64()
                    .ok_or_else(|| Error::type_mismatch("long", json_kind(json)))?;
                Value::Long(v)
            }
            SchemaKind::Float => {
                let v = json
                    .as_f64()
                    .ok_or_else(|| Error::type_mismatch("float", json_kind(json)))?;
                Value::Float(v as f32)
            }
            SchemaKind::Double => {
                let v = json
                    .as_f64()
                    .ok_or_else(|| Error::type_mismatch("double", json_kind(json)))?;
                Value::Double(v)
            }
            SchemaKind::String => match json {
                JsonValue::String(s) => Value::String(s.clone()),
                other => return Err(Error::type_mismatch("string", json_kind(other))),
            },
            SchemaKind::Bytes => match json {
                JsonValue::String(s) => Value::Bytes(s.clone().into_bytes()),
                other => return Err(Error::type_mismatch("bytes", json_kind(other))),
            },
            other => {
                return Err(Error::UnsupportedSchemaKind(other.name().to_string()));
            }
        };
        promote(value, reader.kind())
    }

    fn union_from_json(
        &self,
        json: &JsonValue,
        writer: NodeRef<'_>,
        reader: NodeRef<'_>,
    ) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let branches = match writer.kind() {
            SchemaKind::Union { branches } => branches,
            other => return Err(Error::UnsupportedSchemaKind(other.name().to_string())),
        };

        let tagged: Option<(&str, &JsonValue)> = if self.tuple_union {
            match json {
                JsonValue::Array(items) if items.len() == 2 => {
                    items[0].as_str().map(|tag| (tag, &items[1]))
                }
                _ => None,
            }
        } else {
            match json {
                JsonValue::Object(obj) if obj.len() == 1 => {
                    obj.iter().next().map(|(k, v)| (k.as_str(), v))
                }
                _ => None,
            }
        };
        if let Some((tag, inner)) = tagged {
            for b in branches {
                let branch = writer.at(*b);
                if branch.fullname() == tag {
                    return self.decode(inner, branch, reader);
                }
            }
            trace!(
                discriminator = tag,
                "discriminator not in writer's union, falling back to branch scan"
            );
        }
        for b in branches {
            let branch = writer.at(*b);
            if self.validate_wire(branch, json) {
                return self.decode(json, branch, reader);
            }
        }
        Err(Error::NoMatchingUnionBranch(json_kind(json).to_string()))
    }

    /// Structural check of a raw wire value against a schema; logical types
    /// never participate here
    fn validate_wire(&self, schema: NodeRef<'_>, json: &JsonValue) -> bool {
        match schema.kind() {
            SchemaKind::Null => json.is_null(),
            SchemaKind::Boolean => json.is_boolean(),
            SchemaKind::Int => json
                .as_i64()
                .is_some_and(|v| i32::try_from(v).is_ok()),
            SchemaKind::Long => json.as_i64().is_some(),
            SchemaKind::Float | SchemaKind::Double => json.is_number(),
            SchemaKind::String | SchemaKind::Bytes => json.is_string(),
            SchemaKind::Fixed { size } => json.as_str().is_some_and(|s| s.len() == *size),
            SchemaKind::Enum { symbols } => json
                .as_str()
                .is_some_and(|s| symbols.iter().any(|sym| sym == s)),
            SchemaKind::Array { items } => json.as_array().is_some_and(|els| {
                els.iter().all(|e| self.validate_wire(schema.at(*items), e))
            }),
            SchemaKind::Map { values } => json.as_object().is_some_and(|obj| {
                obj.values().all(|v| self.validate_wire(schema.at(*values), v))
            }),
            SchemaKind::Record { fields } => json.as_object().is_some_and(|obj| {
                fields.iter().all(|f| {
                    self.validate_wire(
                        schema.at(f.ty),
                        obj.get(&f.name).unwrap_or(&JsonValue::Null),
                    )
                })
            }),
            SchemaKind::Union { branches } => {
                let tagged: Option<(&str, &JsonValue)> = if self.tuple_union {
                    match json {
                        JsonValue::Array(items) if items.len() == 2 => {
                            items[0].as_str().map(|tag| (tag, &items[1]))
                        }
                        _ => None,
                    }
                } else {
                    match json {
                        JsonValue::Object(obj) if obj.len() == 1 => {
                            obj.iter().next().map(|(k, v)| (k.as_str(), v))
                        }
                        _ => None,
                    }
                };
                if let Some((tag, inner)) = tagged {
                    let matched = branches.iter().any(|b| {
                        let branch = schema.at(*b);
                        branch.fullname() == tag && self.validate_wire(branch, inner)
                    });
                    if matched {
                        return true;
                    }
                }
                branches
                    .iter()
                    .any(|b| self.validate_wire(schema.at(*b), json))
            }
        }
    }

    fn record_from_json(
        &self,
        json: &JsonValue,
        writer: NodeRef<'_>,
        reader: NodeRef<'_>,
    ) -> Result<Value> {
        let obj = match json {
            JsonValue::Object(obj) => obj,
            other => return Err(Error::type_mismatch(reader.fullname(), json_kind(other))),
        };
        let writer_fields: HashMap<&str, &Field> = match writer.kind() {
            SchemaKind::Record { fields } => {
                fields.iter().map(|f| (f.name.as_str(), f)).collect()
            }
            other => return Err(Error::UnsupportedSchemaKind(other.name().to_string())),
        };
        let reader_fields = match reader.kind() {
            SchemaKind::Record { fields } => fields,
            _ => {
                return Err(Error::SchemaMismatch {
                    writer: writer.fullname(),
                    reader: reader.fullname(),
                })
            }
        };

        let mut remaining: Vec<&String> = obj.keys().collect();
        let mut result = IndexMap::with_capacity(reader_fields.len());
        for rf in reader_fields {
            let r_ty = reader.at(rf.ty);
            let value = match writer_fields.get(rf.name.as_str()) {
                // The writer never knew this field: the reader's own
                // default applies.
                None => {
                    if let Some(default) = &rf.default {
                        self.decode(default, r_ty, r_ty)?
                    } else if effective_type(r_ty).1 {
                        Value::Null
                    } else {
                        return Err(Error::MissingRequiredField {
                            record: reader.fullname(),
                            field: rf.name.clone(),
                        });
                    }
                }
                Some(wf) => {
                    let w_ty = writer.at(wf.ty);
                    if let Some(wire) = obj.get(&rf.name) {
                        remaining.retain(|k| *k != &rf.name);
                        self.decode(wire, w_ty, r_ty)?
                    } else if let Some(default) = &wf.default {
                        // Writer's default, re-expressed under the
                        // reader's type.
                        self.decode(default, w_ty, r_ty)?
                    } else if effective_type(r_ty).1 {
                        Value::Null
                    } else {
                        return Err(Error::MissingRequiredField {
                            record: reader.fullname(),
                            field: rf.name.clone(),
                        });
                    }
                }
            };
            result.insert(rf.name.clone(), value);
        }
        if !remaining.is_empty() {
            return Err(Error::ExtraFields {
                record: reader.fullname(),
                fields: remaining.into_iter().cloned().collect(),
            });
        }
        Ok(self.instantiate_record(result, reader))
    }

    /// Wrap a decoded mapping in a registered record type, trying the
    /// fullname first and the bare name second; unregistered types decode
    /// as plain mappings
    fn instantiate_record(&self, fields: IndexMap<String, Value>, reader: NodeRef<'_>) -> Value {
        let ty = self
            .schema_types
            .get(&reader.fullname())
            .or_else(|| reader.name().and_then(|n| self.schema_types.get(&n.name)));
        match ty {
            Some(ty) => Value::Record(RecordView::from_parts(ty.clone(), fields)),
            None => Value::Map(fields),
        }
    }

    /// Schema-computed default for a field: the declared default decoded
    /// through the from-json path, else null for nullable types, else the
    /// kind-specific zero value
    pub(crate) fn resolved_default(
        &self,
        ty: NodeRef<'_>,
        default: Option<&JsonValue>,
    ) -> Result<Value> {
        if let Some(default) = default {
            return self.from_json_object(default, Some(ty), Some(ty));
        }
        let (effective, nullable) = effective_type(ty);
        if nullable {
            return Ok(Value::Null);
        }
        self.zero_value(effective)
    }

    fn zero_value(&self, ty: NodeRef<'_>) -> Result<Value> {
        match ty.kind() {
            SchemaKind::Null => Ok(Value::Null),
            SchemaKind::Boolean => Ok(Value::Boolean(false)),
            SchemaKind::Int => Ok(Value::Int(0)),
            SchemaKind::Long => Ok(Value::Long(0)),
            SchemaKind::Float => Ok(Value::Float(0.0)),
            SchemaKind::Double => Ok(Value::Double(0.0)),
            SchemaKind::String => Ok(Value::String(String::new())),
            SchemaKind::Bytes | SchemaKind::Fixed { .. } => Ok(Value::Bytes(Vec::new())),
            SchemaKind::Enum { symbols } => symbols
                .first()
                .map(|s| Value::String(s.clone()))
                .ok_or_else(|| Error::UnsupportedSchemaKind("enum with no symbols".to_string())),
            SchemaKind::Array { .. } => Ok(Value::Array(Vec::new())),
            SchemaKind::Map { .. } => Ok(Value::Map(IndexMap::new())),
            SchemaKind::Record { fields } => {
                let mut out = IndexMap::with_capacity(fields.len());
                for field in fields {
                    out.insert(
                        field.name.clone(),
                        self.resolved_default(ty.at(field.ty), field.default.as_ref())?,
                    );
                }
                Ok(self.instantiate_record(out, ty))
            }
            SchemaKind::Union { .. } => Err(Error::UnsupportedSchemaKind(
                "union as an effective default type".to_string(),
            )),
        }
    }
}

fn promote(value: Value, reader_kind: &SchemaKind) -> Result<Value> {
    Ok(match (value, reader_kind) {
        (Value::Int(v), SchemaKind::Long) => Value::Long(i64::from(v)),
        (Value::Int(v), SchemaKind::Float) => Value::Float(v as f32),
        (Value::Int(v), SchemaKind::Double) => Value::Double(f64::from(v)),
        (Value::Long(v), SchemaKind::Float) => Value::Float(v as f32),
        (Value::Long(v), SchemaKind::Double) => Value::Double(v as f64),
        (Value::Float(v), SchemaKind::Double) => Value::Double(f64::from(v)),
        (Value::Bytes(b), SchemaKind::String) => Value::String(
            String::from_utf8(b).map_err(|_| Error::type_mismatch("utf-8 text bytes", "bytes"))?,
        ),
        (Value::String(s), SchemaKind::Bytes) => Value::Bytes(s.into_bytes()),
        (value, _) => value,
    })
}
