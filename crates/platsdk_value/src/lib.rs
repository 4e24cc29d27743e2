//! # platsdk Value
//!
//! Tagged document values for the platsdk bridge.
//!
//! This crate provides:
//! - A `Value` union (null, bool, numbers, text, arrays, objects) used for
//!   document properties and query literals
//! - Representation-agnostic numeric access (`Value::as_number`)
//! - Dotted-path get/set/remove (`"address.city"`, `"tags.0"`)
//! - JSON encoding and decoding through serde
//!
//! ## Usage
//!
//! ```
//! use platsdk_value::{map_from_json, set_at_path, get_at_path, Value};
//!
//! let mut doc = map_from_json(r#"{"address":{"city":"Oslo"}}"#).unwrap();
//! set_at_path(&mut doc, "address.zip", Value::from("0150")).unwrap();
//! assert_eq!(get_at_path(&doc, "address.city"), Some(&Value::from("Oslo")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod path;
mod value;

pub use decoder::{from_json, map_from_json};
pub use encoder::{map_to_json, to_json};
pub use error::{ValueError, ValueResult};
pub use path::{get_at_path, parse_path, remove_at_path, set_at_path};
pub use value::{get_number_field, Value, ValueMap};
