//! Property-based test generators using proptest.
//!
//! Provides strategies for identifiers, property paths and document
//! values. Generated values stay inside what the JSON codec round-trips
//! exactly.

use platsdk_bridge::Identifier;
use platsdk_value::{Value, ValueMap};
use proptest::prelude::*;

/// Strategy for generating identifiers.
pub fn identifier_strategy() -> impl Strategy<Value = Identifier> {
    prop::array::uniform32(any::<u8>()).prop_map(Identifier::from_bytes)
}

/// Strategy for generating property names.
///
/// Names never contain `.` and never start with `$`.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating dotted property paths of one to three segments.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(field_name_strategy(), 1..4).prop_map(|segments| segments.join("."))
}

/// Strategy for generating scalar values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        // Quarter steps have exact decimal forms.
        (-4_000i32..4_000).prop_map(|n| Value::Float(f64::from(n) / 4.0)),
        prop::string::string_regex("[ -~]{0,24}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for generating nested values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating a property map.
pub fn properties_strategy() -> impl Strategy<Value = ValueMap> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..6)
}

/// Strategy for generating valid fixture-note properties.
///
/// `message` is always present as text.
pub fn note_properties_strategy() -> impl Strategy<Value = ValueMap> {
    (properties_strategy(), "[a-z ]{1,16}").prop_map(|(mut properties, message)| {
        properties.insert("message".to_string(), Value::Text(message));
        properties
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
