//! Dynamic values exchanged between records, coercion and output

use indexmap::IndexMap;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Result, SchemaError};
use crate::record::Record;

/// Ordered name → value mapping used for constructor input and output
pub type Fields = IndexMap<String, Value>;

/// A value stored in a record slot, passed to a constructor or emitted by
/// [`Record::to_output`].
///
/// `Record` is a handle: cloning it shares the same instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(Fields),
    Record(Record),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn empty_map() -> Self {
        Value::Map(Fields::new())
    }

    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Truthiness used by boolean coercion: null, zero and empty values are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Record(_) => true,
        }
    }

    /// Convert to JSON, flattening nested records through their output form
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Checked conversion from JSON: integers outside `i64` are rejected
    /// instead of becoming floats
    pub fn from_json(value: serde_json::Value) -> Result<Value> {
        Ok(match value {
            serde_json::Value::Number(n) if n.is_u64() && n.as_i64().is_none() => {
                return Err(SchemaError::InvalidArgument(format!(
                    "integer {} does not fit in 64 bits",
                    n
                )));
            }
            serde_json::Value::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(map) => {
                let mut fields = Fields::with_capacity(map.len());
                for (k, v) in map {
                    fields.insert(k, Value::from_json(v)?);
                }
                Value::Map(fields)
            }
            other => Value::from(other),
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(fields) => serialize_fields(fields, serializer),
            Value::Record(record) => {
                let output = record.to_output().map_err(S::Error::custom)?;
                serialize_fields(&output, serializer)
            }
        }
    }
}

fn serialize_fields<S: Serializer>(
    fields: &Fields,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (k, v) in fields {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

/// Integers beyond `i64` become floats; [`Value::from_json`] rejects them.
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Map(fields)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Build [`Fields`] from a JSON object literal; anything else yields an empty map.
pub fn fields_from_json(value: serde_json::Value) -> Fields {
    match Value::from(value) {
        Value::Map(fields) => fields,
        _ => Fields::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_numbers_keep_integers() {
        assert_eq!(Value::from(json!(3)), Value::Int(3));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
    }

    #[test]
    fn test_oversized_json_integer() {
        let big = json!({"n": [u64::MAX]});
        assert!(matches!(Value::from(big.clone()).as_map().unwrap()["n"], Value::List(_)));
        let err = Value::from_json(big).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidArgument(_)));
        assert!(err.to_string().contains("18446744073709551615"));

        let ok = Value::from_json(json!({"n": i64::MAX, "f": 0.5})).unwrap();
        assert_eq!(ok.as_map().unwrap()["n"], Value::Int(i64::MAX));
        assert_eq!(ok.as_map().unwrap()["f"], Value::Float(0.5));
    }

    #[test]
    fn test_json_object_preserves_order() {
        let v = Value::from(json!({"b": 1, "a": 2}));
        let keys: Vec<_> = v.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::text("").is_truthy());
        assert!(Value::text("false").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::empty_list().is_truthy());
    }

    #[test]
    fn test_to_json() {
        let v = Value::List(vec![Value::Null, Value::Int(1), Value::text("x")]);
        assert_eq!(v.to_json().unwrap(), json!([null, 1, "x"]));
    }
}
