//! Error types for the value crate.

use thiserror::Error;

/// Result type for value operations.
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors that can occur while editing or converting values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The path string itself is malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A path segment walks into a value that has no children.
    #[error("cannot descend into '{segment}' of path '{path}': value is not an object or array")]
    NotAContainer {
        /// The full path being resolved.
        path: String,
        /// The segment whose parent is a scalar.
        segment: String,
    },

    /// An array segment is not a valid index.
    #[error("array index '{segment}' of path '{path}' is out of bounds (length {len})")]
    IndexOutOfBounds {
        /// The full path being resolved.
        path: String,
        /// The segment used as index.
        segment: String,
        /// Length of the array.
        len: usize,
    },

    /// Failed to encode a value to JSON.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode JSON text.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The decoded value was not a JSON object where one was required.
    #[error("expected an object, found {found}")]
    ExpectedObject {
        /// Type name of the value that was found.
        found: &'static str,
    },
}

impl ValueError {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
