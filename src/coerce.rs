//! Value coercion
//!
//! Converts a raw value into what a field stores, following its declared
//! type. Coercion looks one container level deep: `list[Point]` elements are
//! constructed as `Point` records, but `list[list[Point]]` is stored as given.

use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::field::{FieldSpec, FieldType, MapOrder};
use crate::record::{construct, Input};
use crate::schema::Schema;
use crate::value::{Fields, Value};

/// Coerce `raw` for storage in `field`
pub fn coerce(field: &FieldSpec, raw: Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(raw);
    }
    let Some(field_type) = field.field_type() else {
        return Ok(raw);
    };
    match field_type {
        FieldType::Any => Ok(raw),
        FieldType::Record(schema) => coerce_record(schema, raw),
        t if t.is_scalar() => coerce_scalar(field.name(), t, raw),
        FieldType::List(Some(item)) if is_coercible_item(item) => {
            coerce_list(field, field_type, item, raw)
        }
        FieldType::Map(Some(item)) if is_coercible_item(item) => {
            coerce_map(field, field_type, item, raw)
        }
        _ => Ok(raw),
    }
}

fn is_coercible_item(item: &FieldType) -> bool {
    item.is_scalar() || item.record_schema().is_some()
}

/// Construct a record of `schema` from `raw`, or pass a compatible record through
pub fn coerce_record(schema: &Arc<Schema>, raw: Value) -> Result<Value> {
    let input = Input::from_value(schema, raw)?;
    Ok(Value::Record(construct(schema, input, Fields::new())?))
}

fn coerce_item(attribute: &str, item: &FieldType, raw: Value) -> Result<Value> {
    if raw.is_null() {
        return Ok(raw);
    }
    match item {
        FieldType::Record(schema) => coerce_record(schema, raw),
        scalar => coerce_scalar(attribute, scalar, raw),
    }
}

fn coerce_list(field: &FieldSpec, field_type: &FieldType, item: &FieldType, raw: Value) -> Result<Value> {
    let Value::List(items) = raw else {
        return Err(mismatch(field.name(), field_type, &raw));
    };
    trace!(field = field.name(), items = items.len(), "coercing list elements");
    items
        .into_iter()
        .map(|v| coerce_item(field.name(), item, v))
        .collect::<Result<Vec<_>>>()
        .map(Value::List)
}

fn coerce_map(field: &FieldSpec, field_type: &FieldType, item: &FieldType, raw: Value) -> Result<Value> {
    let Value::Map(entries) = raw else {
        return Err(mismatch(field.name(), field_type, &raw));
    };
    trace!(field = field.name(), entries = entries.len(), "coercing map values");
    let mut out = Fields::with_capacity(entries.len());
    for (k, v) in entries {
        out.insert(k, coerce_item(field.name(), item, v)?);
    }
    if field.container_map_order() == MapOrder::Sorted {
        out.sort_keys();
    }
    Ok(Value::Map(out))
}

/// Convert a non-null value to a scalar type
pub fn coerce_scalar(attribute: &str, target: &FieldType, raw: Value) -> Result<Value> {
    let converted = match (target, &raw) {
        (FieldType::Bool, v) => Some(Value::Bool(v.is_truthy())),

        (FieldType::Int, Value::Int(_)) => Some(raw.clone()),
        (FieldType::Int, Value::Float(f)) => float_to_int(*f).map(Value::Int),
        (FieldType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
        (FieldType::Int, Value::Text(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

        (FieldType::Float, Value::Float(_)) => Some(raw.clone()),
        (FieldType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (FieldType::Float, Value::Bool(b)) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
        (FieldType::Float, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

        (FieldType::Text, Value::Text(_)) => Some(raw.clone()),
        (FieldType::Text, Value::Int(i)) => Some(Value::Text(i.to_string())),
        (FieldType::Text, Value::Float(f)) => Some(Value::Text(format!("{:?}", f))),
        (FieldType::Text, Value::Bool(b)) => Some(Value::Text(b.to_string())),
        (FieldType::Text, Value::List(_) | Value::Map(_) | Value::Record(_)) => {
            raw.to_json().ok().map(|json| Value::Text(json.to_string()))
        }

        _ => None,
    };
    converted.ok_or_else(|| mismatch(attribute, target, &raw))
}

/// Truncate toward zero; `None` for non-finite values and values outside i64
fn float_to_int(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn mismatch(attribute: &str, expected: &FieldType, found: &Value) -> SchemaError {
    let found = match found {
        Value::Text(s) => format!("text {:?}", s),
        Value::Record(r) => format!("record {}", r.type_name()),
        other => other.type_name().to_string(),
    };
    SchemaError::Coercion {
        attribute: attribute.to_string(),
        expected: expected.to_string(),
        found,
    }
}
