//! # platsdk Testkit
//!
//! Test utilities for the platsdk bridge.
//!
//! This crate provides:
//! - A mock-backed platform fixture with a published note contract
//! - Property-based test generators using proptest
//! - Stress testing utilities for concurrent sessions
//!
//! ## Usage
//!
//! ```rust
//! use platsdk_testkit::prelude::*;
//!
//! with_platform(|platform| {
//!     let mut note = platform.note_json(r#"{"message":"draft"}"#);
//!     note.set_property("meta.tag", "x").unwrap();
//!     assert_eq!(note.get_property("meta.tag").unwrap(), Some("x".into()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
