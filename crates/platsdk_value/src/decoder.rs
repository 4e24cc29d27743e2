//! JSON decoding for document values.

use crate::error::{ValueError, ValueResult};
use crate::value::{Value, ValueMap};
use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::fmt;

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON-compatible value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = ValueMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Decode a value from JSON text.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON.
pub fn from_json(text: &str) -> ValueResult<Value> {
    serde_json::from_str(text).map_err(|e| ValueError::decoding_failed(e.to_string()))
}

/// Decode an object from JSON text.
///
/// `null` and empty input decode to an empty map, matching how the native
/// side reports a document without properties.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON or is not an object.
pub fn map_from_json(text: &str) -> ValueResult<ValueMap> {
    if text.trim().is_empty() {
        return Ok(ValueMap::new());
    }
    match from_json(text)? {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(ValueMap::new()),
        other => Err(ValueError::ExpectedObject {
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_document() {
        let value = from_json(r#"{"name":"Alice","age":30,"address":{"city":"Oslo"},"tags":["a",1.5,null,true]}"#)
            .unwrap();

        assert_eq!(value.get("name"), Some(&Value::from("Alice")));
        assert_eq!(value.get("age"), Some(&Value::Integer(30)));
        assert_eq!(
            value.get("address").and_then(|a| a.get("city")),
            Some(&Value::from("Oslo"))
        );
        assert_eq!(
            value.get("tags"),
            Some(&Value::Array(vec![
                Value::from("a"),
                Value::Float(1.5),
                Value::Null,
                Value::Bool(true),
            ]))
        );
    }

    #[test]
    fn large_unsigned_survives() {
        let value = from_json("18446744073709551615").unwrap();
        assert!(matches!(value, Value::Unsigned(u64::MAX)));
    }

    #[test]
    fn map_from_json_edge_cases() {
        assert!(map_from_json("").unwrap().is_empty());
        assert!(map_from_json("null").unwrap().is_empty());
        assert_eq!(
            map_from_json("[1]"),
            Err(ValueError::ExpectedObject { found: "array" })
        );
        assert!(matches!(
            map_from_json("{"),
            Err(ValueError::DecodingFailed { .. })
        ));
    }

    #[test]
    fn json_roundtrip_preserves_structure() {
        let text = r#"{"a":{"b":[1,2,{"c":"d"}]},"e":false}"#;
        let value = from_json(text).unwrap();
        assert_eq!(crate::to_json(&value).unwrap(), text);
    }
}
