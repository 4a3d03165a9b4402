//! Serialization of records and extraction across types

use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::field::FieldSpec;
use crate::record::{construct, Input, Record};
use crate::schema::Schema;
use crate::value::{Fields, Value};

impl Record {
    /// Ordered mapping of the output fields, followed by open attributes.
    ///
    /// Unset fields are left out; nested records are serialized recursively.
    pub fn to_output(&self) -> Result<Fields> {
        let schema = self.schema();
        let mut out = Fields::with_capacity(schema.len());
        for field in schema.fields().filter(|f| f.includes_in_output()) {
            let value = match field.read(self) {
                Ok(value) => value,
                Err(SchemaError::AttributeNotPresent { .. }) => continue,
                Err(e) => return Err(e),
            };
            out.insert(field.name().to_string(), output_value(field, value)?);
        }
        if schema.allows_open_attributes() {
            out.extend(self.open_attributes());
        }
        Ok(out)
    }

    /// Extract attributes for `target` (this record's own type when `None`)
    pub fn extract(&self, target: Option<&Arc<Schema>>, selection: &Selection) -> Result<Fields> {
        extract(self, target.unwrap_or(self.schema()), selection)
    }
}

fn output_value(field: &FieldSpec, value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Record(record) => Ok(Value::Map(record.to_output()?)),
        Value::List(items) if field.field_type().is_some_and(|t| t.is_record_container()) => items
            .into_iter()
            .map(|item| output_element(field, item))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Value::Map(entries) if field.field_type().is_some_and(|t| t.is_record_container()) => {
            let mut out = Fields::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, output_element(field, v)?);
            }
            Ok(Value::Map(out))
        }
        other => Ok(other),
    }
}

fn output_element(field: &FieldSpec, item: Value) -> Result<Value> {
    match item {
        Value::Null => Ok(Value::Null),
        Value::Record(record) => Ok(Value::Map(record.to_output()?)),
        other => Err(SchemaError::Coercion {
            attribute: field.name().to_string(),
            expected: "null or record".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// Anything attributes can be extracted from
pub trait AttributeSource {
    /// The value of `name`, if the source has it
    fn attribute(&self, name: &str) -> Option<Value>;

    /// The source as a record, when it is one
    fn as_record(&self) -> Option<&Record> {
        None
    }
}

impl AttributeSource for Record {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).ok()
    }

    fn as_record(&self) -> Option<&Record> {
        Some(self)
    }
}

impl AttributeSource for Fields {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl AttributeSource for serde_json::Map<String, serde_json::Value> {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::from)
    }
}

impl AttributeSource for Value {
    fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(fields) => fields.attribute(name),
            Value::Record(record) => record.attribute(name),
            _ => None,
        }
    }

    fn as_record(&self) -> Option<&Record> {
        Value::as_record(self)
    }
}

/// Which candidate names an extraction keeps. At most one list may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl Selection {
    /// Every candidate
    pub fn all() -> Self {
        Self::default()
    }

    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Some(names.into_iter().map(Into::into).collect()),
            exclude: None,
        }
    }

    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: None,
            exclude: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.include.is_some() && self.exclude.is_some() {
            return Err(SchemaError::InvalidArgument(
                "include and exclude cannot be combined".to_string(),
            ));
        }
        Ok(())
    }

    fn admits(&self, name: &str) -> bool {
        if let Some(include) = &self.include {
            return include.iter().any(|n| n == name);
        }
        if let Some(exclude) = &self.exclude {
            return !exclude.iter().any(|n| n == name);
        }
        true
    }
}

/// Extract the attributes of `source` that `target` can take.
///
/// A record source contributes its serialized form; when `target` allows open
/// attributes, the source's own fields are candidates too.
pub fn extract<S>(source: &S, target: &Schema, selection: &Selection) -> Result<Fields>
where
    S: AttributeSource + ?Sized,
{
    selection.check()?;

    let mut candidates: Vec<&str> = target.field_names().collect();
    let record = source.as_record();
    if let Some(record) = record {
        if target.allows_open_attributes() {
            for name in record.schema().field_names() {
                if !candidates.contains(&name) {
                    candidates.push(name);
                }
            }
        }
    }
    candidates.retain(|name| selection.admits(name));

    let extracted: Fields = match record {
        Some(record) => record
            .to_output()?
            .into_iter()
            .filter(|(name, _)| candidates.contains(&name.as_str()))
            .collect(),
        None => candidates
            .iter()
            .filter_map(|name| source.attribute(name).map(|v| (name.to_string(), v)))
            .collect(),
    };
    trace!(target_type = target.name(), keys = extracted.len(), "extracted attributes");
    Ok(extracted)
}

/// Build a `target` record from whatever `source` offers.
///
/// Non-constructor fields are dropped, as are forbidden names when `target`
/// allows open attributes; `overrides` are applied last.
pub fn create_from<S>(
    target: &Arc<Schema>,
    source: &S,
    selection: &Selection,
    overrides: Fields,
) -> Result<Record>
where
    S: AttributeSource + ?Sized,
{
    let mut values = extract(source, target, selection)?;
    for field in target.fields().filter(|f| !f.is_init()) {
        values.shift_remove(field.name());
    }
    if target.allows_open_attributes() {
        values.retain(|name, _| !target.options().is_forbidden(name));
    }
    construct(target, Input::Mapping(values), overrides)
}
