//! # avrojson
//!
//! Avro JSON encoding for native values: schema-driven serialization,
//! writer/reader schema resolution, union discriminator handling, default
//! backfilling, and logical type coercion.
//!
//! ## Features
//!
//! - **Schema trees**: arena-backed immutable schemas, self-referential
//!   records included ([`schema`])
//! - **Conversion**: validate / to-wire / from-wire with independent writer
//!   and reader schemas ([`convert`])
//! - **Unions**: single-key-object or tuple discriminators, compacted when
//!   unambiguous ([`convert`])
//! - **Records**: schema-validated instances with default backfilling
//!   ([`record`])
//! - **Logical types**: date, time, timestamp, decimal processors behind a
//!   pluggable registry ([`logical`])
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use avrojson::{AvroJsonConverter, SchemaBuilder, SchemaRef, RecordView, Value};
//! use indexmap::indexmap;
//!
//! let mut b = SchemaBuilder::new();
//! let int = b.int();
//! let point = b.record("Point", Some("geo"), vec![b.field("x", int), b.field("y", int)]);
//! let ty = SchemaRef::root(b.build(point));
//!
//! let converter = AvroJsonConverter::builder()
//!     .register_type("geo.Point", ty.clone())
//!     .build();
//!
//! let view = RecordView::construct(
//!     &converter,
//!     &ty,
//!     indexmap! { "x".to_string() => Value::Int(1) },
//! )?;
//! let wire = view.to_obj(&converter)?; // {"x": 1, "y": 0}
//! # Ok::<(), avrojson::Error>(())
//! ```
//!
//! Converters are immutable once built and cheap to clone; share one across
//! threads freely.

pub mod convert;
pub mod error;
pub mod logical;
pub mod record;
pub mod schema;
pub mod value;

pub use convert::{AvroJsonConverter, AvroJsonConverterBuilder};
pub use error::{Error, Result};
pub use logical::{LogicalTypeProcessor, LogicalTypeRegistry};
pub use record::RecordView;
pub use schema::{
    schemas_match, Field, FieldDef, Handle, Name, NodeRef, Schema, SchemaBuilder, SchemaKind,
    SchemaNode, SchemaRef,
};
pub use value::Value;
