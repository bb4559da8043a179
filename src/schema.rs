//! Arena-backed Avro schema trees
//!
//! Schemas are immutable once built. Nodes live in a flat arena and refer to
//! each other through [`Handle`] indices, so a record may reference an
//! ancestor record (self-referential types) without cyclic ownership.
//! Schema *text* parsing is out of scope; trees are assembled through
//! [`SchemaBuilder`].
//!
//! # Example
//!
//! ```rust,ignore
//! use avrojson::schema::SchemaBuilder;
//!
//! let mut b = SchemaBuilder::new();
//! let int = b.int();
//! let string = b.string();
//! let point = b.record(
//!     "Point",
//!     Some("geo"),
//!     vec![b.field("x", int), b.field("y", int)],
//! );
//! let schema = b.build(point);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Stable index of a node within its [`Schema`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Namespace-qualified identifier of a named schema (record, enum, fixed)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(String::from),
        }
    }

    /// Namespace-qualified name, e.g. `geo.Point`
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.name),
            _ => self.name.clone(),
        }
    }
}

/// One declared field of a record schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Handle,
    /// Declared default as a wire-form literal; `Some(JsonValue::Null)` is a
    /// declared null default, `None` means no default at all
    pub default: Option<JsonValue>,
    pub doc: Option<String>,
}

impl Field {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Closed set of Avro schema kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Fixed { size: usize },
    Enum { symbols: Vec<String> },
    Array { items: Handle },
    Map { values: Handle },
    Record { fields: Vec<Field> },
    Union { branches: Vec<Handle> },
}

impl SchemaKind {
    /// Plain type-name tag, `record`/`enum`/`fixed` for named kinds
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Fixed { .. } => "fixed",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Map { .. } => "map",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Union { .. } => "union",
        }
    }
}

/// One node of a schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub name: Option<Name>,
    /// Property bag; `logicalType` lives here
    #[serde(default)]
    pub props: BTreeMap<String, JsonValue>,
    pub doc: Option<String>,
}

/// An immutable schema tree rooted at [`Schema::root`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    root: Handle,
}

impl Schema {
    /// The root node of this tree
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            schema: self,
            handle: self.root,
        }
    }

    /// Resolve a handle within this tree
    pub fn at(&self, handle: Handle) -> NodeRef<'_> {
        NodeRef {
            schema: self,
            handle,
        }
    }

    pub fn root_handle(&self) -> Handle {
        self.root
    }
}

/// A borrowed view of one schema node, carrying its arena for resolution
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    schema: &'a Schema,
    handle: Handle,
}

impl<'a> NodeRef<'a> {
    pub fn node(self) -> &'a SchemaNode {
        &self.schema.nodes[self.handle.index()]
    }

    pub fn kind(self) -> &'a SchemaKind {
        &self.node().kind
    }

    pub fn name(self) -> Option<&'a Name> {
        self.node().name.as_ref()
    }

    pub fn handle(self) -> Handle {
        self.handle
    }

    pub fn tree(self) -> &'a Schema {
        self.schema
    }

    /// Resolve another handle in the same arena
    pub fn at(self, handle: Handle) -> NodeRef<'a> {
        NodeRef {
            schema: self.schema,
            handle,
        }
    }

    /// Union discriminator name: fullname for named types, the plain kind
    /// name otherwise
    pub fn fullname(self) -> String {
        match self.name() {
            Some(name) => name.fullname(),
            None => self.kind().name().to_string(),
        }
    }

    pub fn kind_name(self) -> &'static str {
        self.kind().name()
    }

    /// The `logicalType` tag of this node, if any
    pub fn logical_tag(self) -> Option<&'a str> {
        self.node().props.get("logicalType").and_then(|v| v.as_str())
    }

    pub fn is_union(self) -> bool {
        matches!(self.kind(), SchemaKind::Union { .. })
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("kind", &self.kind_name())
            .field("fullname", &self.fullname())
            .finish()
    }
}

/// A shared, owned handle to one node of a schema tree
///
/// This is the identity a [`crate::record::RecordView`] carries: the arena
/// plus the handle of its record node.
#[derive(Debug, Clone)]
pub struct SchemaRef {
    schema: Arc<Schema>,
    handle: Handle,
}

impl SchemaRef {
    pub fn new(schema: Arc<Schema>, handle: Handle) -> Self {
        Self { schema, handle }
    }

    /// Reference the root node of a tree
    pub fn root(schema: Arc<Schema>) -> Self {
        let handle = schema.root_handle();
        Self { schema, handle }
    }

    pub fn as_node(&self) -> NodeRef<'_> {
        self.schema.at(self.handle)
    }

    pub fn fullname(&self) -> String {
        self.as_node().fullname()
    }
}

/// Structural writer/reader compatibility per Avro schema resolution
///
/// Unions match anything (branch selection happens during conversion), named
/// types match on fullname, and the standard numeric promotions plus
/// string/bytes interop apply.
pub fn schemas_match(writer: NodeRef<'_>, reader: NodeRef<'_>) -> bool {
    use SchemaKind::*;
    match (writer.kind(), reader.kind()) {
        (Union { .. }, _) | (_, Union { .. }) => true,
        (Null, Null)
        | (Boolean, Boolean)
        | (Int, Int)
        | (Long, Long)
        | (Float, Float)
        | (Double, Double)
        | (Bytes, Bytes)
        | (String, String) => true,
        // Promotions
        (Int, Long) | (Int, Float) | (Int, Double) => true,
        (Long, Float) | (Long, Double) => true,
        (Float, Double) => true,
        (String, Bytes) | (Bytes, String) => true,
        (Fixed { size: w }, Fixed { size: r }) => w == r && writer.fullname() == reader.fullname(),
        (Enum { .. }, Enum { .. }) => writer.fullname() == reader.fullname(),
        (Record { .. }, Record { .. }) => writer.fullname() == reader.fullname(),
        (Array { items: w }, Array { items: r }) => {
            schemas_match(writer.at(*w), reader.at(*r))
        }
        (Map { values: w }, Map { values: r }) => schemas_match(writer.at(*w), reader.at(*r)),
        _ => false,
    }
}

/// The effective type a defaulting decision is made against
///
/// For a union this is its first non-null branch (or the union's own null
/// branch if no such branch exists). The second component reports whether
/// the type is nullable.
pub fn effective_type(ty: NodeRef<'_>) -> (NodeRef<'_>, bool) {
    match ty.kind() {
        SchemaKind::Union { branches } => {
            let nullable = branches
                .iter()
                .any(|b| matches!(ty.at(*b).kind(), SchemaKind::Null));
            match branches
                .iter()
                .find(|b| !matches!(ty.at(**b).kind(), SchemaKind::Null))
            {
                Some(b) => (ty.at(*b), nullable),
                None => (ty, true),
            }
        }
        SchemaKind::Null => (ty, true),
        _ => (ty, false),
    }
}

/// Declaration of one record field, consumed by [`SchemaBuilder`]
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    ty: Handle,
    default: Option<JsonValue>,
    doc: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Handle) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            doc: None,
        }
    }

    /// Attach a declared default (wire-form literal)
    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Incremental schema-tree builder
///
/// Every call allocates a fresh node; only explicitly declared records can
/// be referenced again (which is how self-referential types are expressed:
/// `declare_record` first, reference the handle inside the field list, then
/// `define_record`).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<SchemaNode>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: SchemaKind, name: Option<Name>) -> Handle {
        let handle = Handle(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            kind,
            name,
            props: BTreeMap::new(),
            doc: None,
        });
        handle
    }

    pub fn null(&mut self) -> Handle {
        self.push(SchemaKind::Null, None)
    }

    pub fn boolean(&mut self) -> Handle {
        self.push(SchemaKind::Boolean, None)
    }

    pub fn int(&mut self) -> Handle {
        self.push(SchemaKind::Int, None)
    }

    pub fn long(&mut self) -> Handle {
        self.push(SchemaKind::Long, None)
    }

    pub fn float(&mut self) -> Handle {
        self.push(SchemaKind::Float, None)
    }

    pub fn double(&mut self) -> Handle {
        self.push(SchemaKind::Double, None)
    }

    pub fn bytes(&mut self) -> Handle {
        self.push(SchemaKind::Bytes, None)
    }

    pub fn string(&mut self) -> Handle {
        self.push(SchemaKind::String, None)
    }

    pub fn fixed(&mut self, name: &str, namespace: Option<&str>, size: usize) -> Handle {
        self.push(SchemaKind::Fixed { size }, Some(Name::new(name, namespace)))
    }

    pub fn enumeration(&mut self, name: &str, namespace: Option<&str>, symbols: &[&str]) -> Handle {
        self.push(
            SchemaKind::Enum {
                symbols: symbols.iter().map(|s| s.to_string()).collect(),
            },
            Some(Name::new(name, namespace)),
        )
    }

    pub fn array(&mut self, items: Handle) -> Handle {
        self.push(SchemaKind::Array { items }, None)
    }

    pub fn map(&mut self, values: Handle) -> Handle {
        self.push(SchemaKind::Map { values }, None)
    }

    /// Build a union node. Directly nested unions are illegal in Avro.
    pub fn union(&mut self, branches: Vec<Handle>) -> Result<Handle> {
        for b in &branches {
            if matches!(self.nodes[b.index()].kind, SchemaKind::Union { .. }) {
                return Err(Error::UnsupportedSchemaKind(
                    "union may not immediately contain another union".to_string(),
                ));
            }
        }
        Ok(self.push(SchemaKind::Union { branches }, None))
    }

    /// Reserve a record node so fields may reference it (self-referential
    /// types); fill it in later with [`SchemaBuilder::define_record`].
    pub fn declare_record(&mut self, name: &str, namespace: Option<&str>) -> Handle {
        self.push(
            SchemaKind::Record { fields: Vec::new() },
            Some(Name::new(name, namespace)),
        )
    }

    /// Attach the field list of a previously declared record
    pub fn define_record(&mut self, record: Handle, fields: Vec<FieldDef>) {
        let fields = fields
            .into_iter()
            .map(|f| Field {
                name: f.name,
                ty: f.ty,
                default: f.default,
                doc: f.doc,
            })
            .collect();
        self.nodes[record.index()].kind = SchemaKind::Record { fields };
    }

    /// Declare and define a record in one step
    pub fn record(&mut self, name: &str, namespace: Option<&str>, fields: Vec<FieldDef>) -> Handle {
        let handle = self.declare_record(name, namespace);
        self.define_record(handle, fields);
        handle
    }

    /// Field declaration helper; `&self` receiver keeps call sites terse
    pub fn field(&self, name: impl Into<String>, ty: Handle) -> FieldDef {
        FieldDef::new(name, ty)
    }

    /// Set a property on a node, returning the handle for chaining
    pub fn prop(&mut self, handle: Handle, key: &str, value: JsonValue) -> Handle {
        self.nodes[handle.index()]
            .props
            .insert(key.to_string(), value);
        handle
    }

    /// Tag a node with a `logicalType`
    pub fn logical(&mut self, handle: Handle, tag: &str) -> Handle {
        self.prop(handle, "logicalType", JsonValue::String(tag.to_string()))
    }

    pub fn doc(&mut self, handle: Handle, doc: impl Into<String>) -> Handle {
        self.nodes[handle.index()].doc = Some(doc.into());
        handle
    }

    /// Finish the tree, rooting it at `root`
    pub fn build(self, root: Handle) -> Arc<Schema> {
        Arc::new(Schema {
            nodes: self.nodes,
            root,
        })
    }
}
