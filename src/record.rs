//! Records: construction, attribute access and the mutation guard
//!
//! A [`Record`] is a shared handle to one instance of an aggregate type.
//! Cloning the handle does not copy the instance; constructing a record from
//! an existing record of the same type (or a subtype) returns that same
//! record.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::error::{Result, SchemaError};
use crate::schema::{Attribute, Schema};
use crate::value::{Fields, Value};

/// Post-construction hook. Receives the record and a handle on the parent
/// type's hook, which it must call.
pub type PostInit = Arc<dyn Fn(&Record, Super<'_>) -> Result<()> + Send + Sync>;

/// The remainder of a post-construction hook chain
pub struct Super<'a> {
    record: &'a Record,
    rest: &'a [PostInit],
}

impl Super<'_> {
    /// Run the parent hook (eventually reaching the base hook)
    pub fn call(self) -> Result<()> {
        match self.rest.split_first() {
            Some((hook, rest)) => hook(
                self.record,
                Super {
                    record: self.record,
                    rest,
                },
            ),
            None => {
                self.record.state().base_hook_reached = true;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct RecordState {
    /// Stored field values; absent means never set
    slots: Fields,
    /// Non-field names written while initializing
    internal: Fields,
    /// Open attributes (only used when the schema allows them)
    open: Fields,
    initializing: bool,
    base_hook_reached: bool,
}

struct RecordInner {
    schema: Arc<Schema>,
    state: Mutex<RecordState>,
}

/// Handle on one instance of an aggregate type
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

/// Positional constructor input
#[derive(Debug, Clone)]
pub enum Input {
    Empty,
    Mapping(Fields),
    Instance(Record),
}

impl Input {
    /// Classify a raw value as constructor input for `schema`
    pub fn from_value(schema: &Schema, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Input::Empty),
            Value::Map(fields) => Ok(Input::Mapping(fields)),
            Value::Record(record) => Ok(Input::Instance(record)),
            other => Err(SchemaError::construction(
                schema.name(),
                format!("expected a mapping or a record, got {}", other.type_name()),
            )),
        }
    }
}

impl From<Fields> for Input {
    fn from(fields: Fields) -> Self {
        Input::Mapping(fields)
    }
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Input::Instance(record)
    }
}

/// Construct a record of `schema`.
///
/// `overrides` are merged over a mapping input. An `Input::Instance` whose type
/// is `schema` or one of its subtypes is returned as is.
pub fn construct(schema: &Arc<Schema>, input: Input, overrides: Fields) -> Result<Record> {
    let mut values = match input {
        Input::Instance(record) => {
            if record.schema().is_subtype_of(schema) {
                if !overrides.is_empty() {
                    debug!(
                        type_name = schema.name(),
                        "overrides ignored when constructing from an existing record"
                    );
                }
                return Ok(record);
            }
            return Err(SchemaError::construction(
                schema.name(),
                format!("a {} record is not a {}", record.type_name(), schema.name()),
            ));
        }
        Input::Empty => Fields::new(),
        Input::Mapping(fields) => fields,
    };
    values.extend(overrides);

    trace!(type_name = schema.name(), keys = values.len(), "constructing record");

    for field in schema.fields() {
        if field.is_required() && !values.contains_key(field.name()) {
            return Err(SchemaError::construction(
                schema.name(),
                format!("field {:?} is required", field.name()),
            ));
        }
    }

    let record = Record::blank(schema);

    for field in schema.fields() {
        match values.shift_remove(field.name()) {
            Some(raw) => {
                if !field.is_init() {
                    return Err(SchemaError::construction(
                        schema.name(),
                        format!("{:?} is not a constructor field", field.name()),
                    ));
                }
                field.write(&record, raw)?;
            }
            None => {
                if let Some(initial) = field.initial_value() {
                    field.write(&record, initial)?;
                } else if schema.initializes_all_fields() && field.is_init() {
                    field.write(&record, Value::Null)?;
                }
            }
        }
    }

    if !values.is_empty() {
        if !schema.allows_open_attributes() {
            let keys: Vec<&str> = values.keys().map(String::as_str).collect();
            return Err(SchemaError::construction(
                schema.name(),
                format!("unexpected attributes: {}", keys.join(", ")),
            ));
        }
        for (name, value) in values {
            if schema.options().is_forbidden(&name) {
                return Err(SchemaError::construction(
                    schema.name(),
                    format!("open attribute {:?} is forbidden", name),
                ));
            }
            record.state().open.insert(name, value);
        }
    }

    record.run_post_init()?;
    record.state().initializing = false;
    Ok(record)
}

impl Record {
    /// Construct from a mapping, a compatible record, or null (no input)
    pub fn new(schema: &Arc<Schema>, input: impl Into<Value>) -> Result<Record> {
        let input = Input::from_value(schema, input.into())?;
        construct(schema, input, Fields::new())
    }

    fn blank(schema: &Arc<Schema>) -> Record {
        Record {
            inner: Arc::new(RecordInner {
                schema: Arc::clone(schema),
                state: Mutex::new(RecordState {
                    initializing: true,
                    ..RecordState::default()
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn run_post_init(&self) -> Result<()> {
        self.state().base_hook_reached = false;
        Super {
            record: self,
            rest: self.inner.schema.hooks(),
        }
        .call()?;
        if !self.state().base_hook_reached {
            return Err(SchemaError::HookContract {
                type_name: self.type_name().to_string(),
            });
        }
        Ok(())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn type_name(&self) -> &str {
        self.inner.schema.name()
    }

    /// True only while the record is being constructed
    pub fn is_initializing(&self) -> bool {
        self.state().initializing
    }

    /// Same instance (not merely equal)
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn slot(&self, name: &str) -> Option<Value> {
        self.state().slots.get(name).cloned()
    }

    pub(crate) fn store_slot(&self, name: &str, value: Value) {
        self.state().slots.insert(name.to_string(), value);
    }

    /// Read an attribute: a field, a type-level property, an internal slot,
    /// a type-level constant or an open attribute, in that order.
    pub fn get(&self, name: &str) -> Result<Value> {
        let constant = match self.inner.schema.attribute(name) {
            Some(Attribute::Field(field)) => return field.read(self),
            Some(Attribute::Property(accessor)) => return accessor(self),
            Some(Attribute::Constant(value)) => Some(value.clone()),
            None => None,
        };
        let state = self.state();
        if let Some(value) = state.internal.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = constant {
            return Ok(value);
        }
        if self.inner.schema.allows_open_attributes() {
            if let Some(value) = state.open.get(name) {
                return Ok(value.clone());
            }
        }
        Err(SchemaError::not_present(self.type_name(), name))
    }

    /// Whether [`Record::get`] succeeds for `name`
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Write an attribute through the mutation guard
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let schema = &self.inner.schema;
        match schema.attribute(name) {
            Some(Attribute::Field(field)) => return field.write(self, value),
            Some(Attribute::Property(_)) | Some(Attribute::Constant(_)) => {
                return Err(SchemaError::mutation(
                    self.type_name(),
                    name,
                    "type-level attributes cannot be set on a record",
                ));
            }
            None => {}
        }

        let mut state = self.state();
        if state.initializing || state.internal.contains_key(name) {
            state.internal.insert(name.to_string(), value);
            return Ok(());
        }
        // the forbidden list only guards construction input
        if schema.allows_open_attributes() {
            state.open.insert(name.to_string(), value);
            return Ok(());
        }
        Err(SchemaError::mutation(
            self.type_name(),
            name,
            "unknown attribute",
        ))
    }

    /// Apply `mapping` then `overrides` through [`Record::set`], skipping
    /// names listed in `exclude`
    pub fn update_attributes(&self, mapping: Fields, exclude: &[&str], overrides: Fields) -> Result<()> {
        let mut values = mapping;
        values.extend(overrides);
        for (name, value) in values {
            if exclude.contains(&name.as_str()) {
                continue;
            }
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Open attributes in insertion order
    pub fn open_attributes(&self) -> Fields {
        self.state().open.clone()
    }

    fn snapshot(&self) -> RecordState {
        self.state().clone()
    }
}

/// Same exact type and identical slot state
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if !Arc::ptr_eq(&self.inner.schema, &other.inner.schema) {
            return false;
        }
        let (a, b) = (self.snapshot(), other.snapshot());
        a.slots == b.slots && a.internal == b.internal && a.open == b.open
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record<{}>@{:p}", self.type_name(), Arc::as_ptr(&self.inner))
    }
}

/// The resolved schema of a record
pub fn schema_of(record: &Record) -> &Arc<Schema> {
    record.schema()
}

/// Whether the value is an instance of an aggregate type
pub fn is_aggregate(value: &Value) -> bool {
    matches!(value, Value::Record(_))
}
