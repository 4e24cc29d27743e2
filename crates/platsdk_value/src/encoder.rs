//! JSON encoding for document values.

use crate::error::{ValueError, ValueResult};
use crate::value::{Value, ValueMap};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Unsigned(n) => serializer.serialize_u64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Encode a value as compact JSON text.
///
/// # Errors
///
/// Returns an error for non-finite floats, which JSON cannot represent.
pub fn to_json(value: &Value) -> ValueResult<String> {
    ensure_finite(value)?;
    serde_json::to_string(value).map_err(|e| ValueError::encoding_failed(e.to_string()))
}

/// Encode an object as compact JSON text.
///
/// # Errors
///
/// Returns an error for non-finite floats anywhere in the map.
pub fn map_to_json(map: &ValueMap) -> ValueResult<String> {
    for value in map.values() {
        ensure_finite(value)?;
    }
    serde_json::to_string(map).map_err(|e| ValueError::encoding_failed(e.to_string()))
}

// serde_json silently writes `null` for NaN and infinities.
fn ensure_finite(value: &Value) -> ValueResult<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(ValueError::encoding_failed(format!(
            "non-finite number {f} cannot be encoded"
        ))),
        Value::Array(items) => items.iter().try_for_each(ensure_finite),
        Value::Map(entries) => entries.values().try_for_each(ensure_finite),
        _ => Ok(()),
    }
}
