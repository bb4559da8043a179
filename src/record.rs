//! Schema-validated record instances
//!
//! A [`RecordView`] owns one field-name → value map for a record schema.
//! After construction the key set equals the schema's field-name set
//! exactly; mutation happens only through the per-field setter, never
//! through arbitrary key insertion.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::convert::AvroJsonConverter;
use crate::error::{Error, Result};
use crate::schema::{NodeRef, SchemaKind, SchemaRef};
use crate::value::Value;

/// One record (or error) instance bound to its schema type
#[derive(Debug, Clone)]
pub struct RecordView {
    ty: SchemaRef,
    fields: IndexMap<String, Value>,
}

impl RecordView {
    /// Build a fully-populated instance from a raw mapping
    ///
    /// Fails with [`Error::UnknownField`] if any key is not a declared
    /// field; declared fields missing from the mapping are backfilled with
    /// their schema-computed defaults.
    pub fn construct(
        converter: &AvroJsonConverter,
        ty: &SchemaRef,
        mut mapping: IndexMap<String, Value>,
    ) -> Result<Self> {
        let node = ty.as_node();
        let declared = match node.kind() {
            SchemaKind::Record { fields } => fields,
            other => {
                return Err(Error::UnsupportedSchemaKind(format!(
                    "cannot construct a record from a {} schema",
                    other.name()
                )))
            }
        };

        if let Some(key) = mapping
            .keys()
            .find(|k| !declared.iter().any(|f| &f.name == *k))
        {
            return Err(Error::UnknownField {
                record: node.fullname(),
                field: key.clone(),
            });
        }

        let mut fields = IndexMap::with_capacity(declared.len());
        for field in declared {
            let value = match mapping.swap_remove(&field.name) {
                Some(value) => value,
                None => converter.resolved_default(node.at(field.ty), field.default.as_ref())?,
            };
            fields.insert(field.name.clone(), value);
        }

        Ok(Self {
            ty: ty.clone(),
            fields,
        })
    }

    /// Decode a wire object into an instance of this type
    pub fn from_obj(
        converter: &AvroJsonConverter,
        ty: &SchemaRef,
        json: &JsonValue,
    ) -> Result<Self> {
        let node = ty.as_node();
        match converter.from_json_object(json, Some(node), Some(node))? {
            Value::Record(view) => Ok(view),
            Value::Map(map) => Self::construct(converter, ty, map),
            other => Err(Error::type_mismatch(node.fullname(), other.kind_name())),
        }
    }

    pub(crate) fn from_parts(ty: SchemaRef, fields: IndexMap<String, Value>) -> Self {
        Self { ty, fields }
    }

    /// Plain lookup, no schema check
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Lookup with a caller-supplied fallback
    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.fields.get(name).unwrap_or(default)
    }

    /// Replace one declared field's value
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::UnknownField {
                record: self.fullname(),
                field: name.to_string(),
            }),
        }
    }

    /// Field map in schema order
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// The record's own declared schema node
    pub fn schema(&self) -> NodeRef<'_> {
        self.ty.as_node()
    }

    pub fn schema_ref(&self) -> &SchemaRef {
        &self.ty
    }

    pub fn fullname(&self) -> String {
        self.ty.fullname()
    }

    /// Encode this instance as a wire object against its own schema
    pub fn to_obj(&self, converter: &AvroJsonConverter) -> Result<JsonValue> {
        let value = Value::Record(self.clone());
        converter.to_json_object(&value, Some(self.ty.as_node()))
    }

    /// Structural check against the record's own schema
    pub fn validate(&self, converter: &AvroJsonConverter) -> bool {
        let value = Value::Record(self.clone());
        converter.validate(self.ty.as_node(), &value)
    }
}

// Equality is value-based over the full field map; schema identity does not
// participate.
impl PartialEq for RecordView {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}
