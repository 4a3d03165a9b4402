//! Field specifications and the per-field access protocol
//!
//! A [`FieldSpec`] is shared by every record of the type that declares it (and,
//! cloned, by its subtypes). It never holds per-record state: reads and writes
//! go through [`FieldSpec::read`] and [`FieldSpec::write`], which consult the
//! record's slots.

use std::fmt;
use std::sync::Arc;

use crate::coerce::coerce;
use crate::error::{Result, SchemaError};
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Value;

/// Computes a value from a record (computed fields and type-level properties)
pub type Accessor = Arc<dyn Fn(&Record) -> Result<Value> + Send + Sync>;

/// Produces a fresh default for every new record
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Declared type of a field
#[derive(Clone)]
pub enum FieldType {
    /// Unconstrained: values are stored as given
    Any,
    Bool,
    Int,
    Float,
    Text,
    /// Another declared aggregate type
    Record(Arc<Schema>),
    /// Sequence, optionally with an element type
    List(Option<Box<FieldType>>),
    /// Text-keyed mapping, optionally with a value type
    Map(Option<Box<FieldType>>),
    /// A host type the engine does not interpret
    Opaque(String),
}

impl FieldType {
    pub fn record(schema: &Arc<Schema>) -> Self {
        FieldType::Record(Arc::clone(schema))
    }

    pub fn list_of(item: FieldType) -> Self {
        FieldType::List(Some(Box::new(item)))
    }

    pub fn map_of(item: FieldType) -> Self {
        FieldType::Map(Some(Box::new(item)))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::Bool | FieldType::Int | FieldType::Float | FieldType::Text
        )
    }

    /// The aggregate schema if this is a record type
    pub fn record_schema(&self) -> Option<&Arc<Schema>> {
        match self {
            FieldType::Record(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldType::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, FieldType::Map(_))
    }

    /// Element type of a list or value type of a map
    pub fn item_type(&self) -> Option<&FieldType> {
        match self {
            FieldType::List(item) | FieldType::Map(item) => item.as_deref(),
            _ => None,
        }
    }

    /// True for `list[R]` / `map[R]` where `R` is an aggregate type
    pub fn is_record_container(&self) -> bool {
        self.item_type()
            .map(|item| item.record_schema().is_some())
            .unwrap_or(false)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Any => write!(f, "any"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Text => write!(f, "text"),
            FieldType::Record(schema) => write!(f, "{}", schema.name()),
            FieldType::List(None) => write!(f, "list"),
            FieldType::List(Some(item)) => write!(f, "list[{}]", item),
            FieldType::Map(None) => write!(f, "map"),
            FieldType::Map(Some(item)) => write!(f, "map[{}]", item),
            FieldType::Opaque(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldType({})", self)
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Any, FieldType::Any)
            | (FieldType::Bool, FieldType::Bool)
            | (FieldType::Int, FieldType::Int)
            | (FieldType::Float, FieldType::Float)
            | (FieldType::Text, FieldType::Text) => true,
            (FieldType::Record(a), FieldType::Record(b)) => {
                Arc::ptr_eq(a, b) || a.name() == b.name()
            }
            (FieldType::List(a), FieldType::List(b)) | (FieldType::Map(a), FieldType::Map(b)) => {
                a == b
            }
            (FieldType::Opaque(a), FieldType::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

/// Key order of a materialized mapping field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapOrder {
    /// Keys keep the order of the raw input
    #[default]
    Insertion,
    /// Keys are sorted lexicographically
    Sorted,
}

/// Metadata and access rules for one named attribute
#[derive(Clone)]
pub struct FieldSpec {
    name: Option<String>,
    field_type: Option<FieldType>,
    default: Option<Value>,
    default_factory: Option<DefaultFactory>,
    read_only: bool,
    required: bool,
    init: Option<bool>,
    output: bool,
    accessor: Option<Accessor>,
    map_order: MapOrder,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSpec {
    /// An unnamed, untyped field with no default
    pub fn new() -> Self {
        Self {
            name: None,
            field_type: None,
            default: None,
            default_factory: None,
            read_only: false,
            required: false,
            init: None,
            output: true,
            accessor: None,
            map_order: MapOrder::Insertion,
        }
    }

    /// A computed field: `accessor` runs on every read, the field is never
    /// constructor input and never stored.
    pub fn computed<F>(name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new().named(name).with_accessor(accessor)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn typed(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn init(mut self, init: bool) -> Self {
        self.init = Some(init);
        self
    }

    /// Whether [`Record::to_output`] emits this field
    pub fn output(mut self, output: bool) -> Self {
        self.output = output;
        self
    }

    pub fn with_accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    pub fn map_order(mut self, order: MapOrder) -> Self {
        self.map_order = order;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn field_type(&self) -> Option<&FieldType> {
        self.field_type.as_ref()
    }

    pub fn static_default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default_factory(&self) -> bool {
        self.default_factory.is_some()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.default_factory.is_some()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether constructor input may supply this field.
    ///
    /// Defaults to `true`, or `false` when a computed accessor is attached.
    pub fn is_init(&self) -> bool {
        self.init.unwrap_or(self.accessor.is_none())
    }

    pub fn includes_in_output(&self) -> bool {
        self.output
    }

    pub fn is_computed(&self) -> bool {
        self.accessor.is_some()
    }

    pub fn container_map_order(&self) -> MapOrder {
        self.map_order
    }

    /// The value a new record receives when input omits this field: the
    /// factory result if present, otherwise the static default.
    pub fn initial_value(&self) -> Option<Value> {
        match &self.default_factory {
            Some(factory) => Some(factory()),
            None => self.default.clone(),
        }
    }

    pub(crate) fn bind_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    pub(crate) fn bind_type(&mut self, field_type: Option<FieldType>) {
        self.field_type = field_type;
    }

    /// Check the field's own invariants
    pub fn validate(&self, type_name: &str) -> Result<()> {
        if self.required && self.accessor.is_some() {
            return Err(SchemaError::configuration(
                type_name,
                self.name(),
                "a field cannot be both required and computed",
            ));
        }
        if self.accessor.is_some() && self.init == Some(true) {
            return Err(SchemaError::configuration(
                type_name,
                self.name(),
                "a computed field cannot be constructor input",
            ));
        }
        Ok(())
    }

    /// Read this field from `record`
    pub fn read(&self, record: &Record) -> Result<Value> {
        if let Some(accessor) = &self.accessor {
            return accessor(record);
        }
        record
            .slot(self.name())
            .ok_or_else(|| SchemaError::not_present(record.type_name(), self.name()))
    }

    /// Coerce `raw` and store it on `record`
    pub fn write(&self, record: &Record, raw: Value) -> Result<()> {
        if self.accessor.is_some() {
            return Err(SchemaError::mutation(
                record.type_name(),
                self.name(),
                "computed fields cannot be set",
            ));
        }
        if self.read_only && !record.is_initializing() {
            return Err(SchemaError::mutation(
                record.type_name(),
                self.name(),
                "field is read-only",
            ));
        }
        let value = coerce(self, raw)?;
        record.store_slot(self.name(), value);
        Ok(())
    }
}

fn same_callback<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Configuration equality; callbacks compare by identity
impl PartialEq for FieldSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.field_type == other.field_type
            && self.default == other.default
            && same_callback(&self.default_factory, &other.default_factory)
            && self.read_only == other.read_only
            && self.required == other.required
            && self.is_init() == other.is_init()
            && self.output == other.output
            && same_callback(&self.accessor, &other.accessor)
            && self.map_order == other.map_order
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("default", &self.default)
            .field("default_factory", &self.default_factory.is_some())
            .field("read_only", &self.read_only)
            .field("required", &self.required)
            .field("init", &self.is_init())
            .field("output", &self.output)
            .field("computed", &self.accessor.is_some())
            .finish()
    }
}
