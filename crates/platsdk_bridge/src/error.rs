//! Error codes and result types.

use crate::native::ResultDataType;
use platsdk_value::ValueError;
use thiserror::Error;

/// Result type for bridge operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Numeric error code reported by the native core.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Operation succeeded.
    Success = 0,
    /// Invalid parameter.
    InvalidParameter = 1,
    /// Operation not valid in the current state.
    InvalidState = 2,
    /// Network failure.
    NetworkError = 3,
    /// Data could not be (de)serialized.
    SerializationError = 4,
    /// Protocol violation.
    ProtocolError = 5,
    /// Signing or verification failure.
    CryptoError = 6,
    /// Entity not found.
    NotFound = 7,
    /// Operation timed out.
    Timeout = 8,
    /// Feature not implemented.
    NotImplemented = 9,
    /// Internal error.
    InternalError = 99,
}

impl ErrorCode {
    /// Returns true if the code indicates success.
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            0 => ErrorCode::Success,
            1 => ErrorCode::InvalidParameter,
            2 => ErrorCode::InvalidState,
            3 => ErrorCode::NetworkError,
            4 => ErrorCode::SerializationError,
            5 => ErrorCode::ProtocolError,
            6 => ErrorCode::CryptoError,
            7 => ErrorCode::NotFound,
            8 => ErrorCode::Timeout,
            9 => ErrorCode::NotImplemented,
            _ => ErrorCode::InternalError,
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code as i32
    }
}

/// Classification of an [`SdkError`].
///
/// Native kinds mirror [`ErrorCode`]; the remaining kinds are raised on the
/// host side before any native call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid parameter.
    InvalidParameter,
    /// Operation not valid in the current state.
    InvalidState,
    /// Network failure.
    NetworkError,
    /// Data could not be (de)serialized.
    SerializationError,
    /// Protocol violation.
    ProtocolError,
    /// Signing or verification failure.
    CryptoError,
    /// Entity not found.
    NotFound,
    /// Operation timed out.
    Timeout,
    /// Feature not implemented.
    NotImplemented,
    /// Internal error.
    InternalError,
    /// The SDK session was closed.
    ContextClosed,
    /// The entity was materialized without a native handle.
    HandleMissing,
    /// A required argument failed local validation.
    ValidationFailed,
}

impl ErrorKind {
    /// Returns true for kinds detected on the host side.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            ErrorKind::ContextClosed | ErrorKind::HandleMissing | ErrorKind::ValidationFailed
        )
    }
}

impl From<ErrorCode> for ErrorKind {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::InvalidParameter => ErrorKind::InvalidParameter,
            ErrorCode::InvalidState => ErrorKind::InvalidState,
            ErrorCode::NetworkError => ErrorKind::NetworkError,
            ErrorCode::SerializationError => ErrorKind::SerializationError,
            ErrorCode::ProtocolError => ErrorKind::ProtocolError,
            ErrorCode::CryptoError => ErrorKind::CryptoError,
            ErrorCode::NotFound => ErrorKind::NotFound,
            ErrorCode::Timeout => ErrorKind::Timeout,
            ErrorCode::NotImplemented => ErrorKind::NotImplemented,
            // A failed result carrying `Success` is itself a core bug.
            ErrorCode::Success | ErrorCode::InternalError => ErrorKind::InternalError,
        }
    }
}

/// Errors produced by the bridge.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// The SDK session was closed.
    #[error("SDK is closed")]
    ContextClosed,

    /// Info was requested from an entity that never had a native handle.
    #[error("{entity} has no handle - created from search results")]
    NoHandle {
        /// Entity name.
        entity: &'static str,
    },

    /// A native operation was attempted on an entity without a handle.
    #[error("cannot {operation} {entity} without handle - {entity} was created from search results")]
    HandleMissing {
        /// Entity name.
        entity: &'static str,
        /// Attempted operation.
        operation: String,
    },

    /// The entity's handle was released.
    #[error("cannot {operation} {entity}: handle was released and is no longer usable")]
    HandleReleased {
        /// Entity name.
        entity: &'static str,
        /// Attempted operation.
        operation: String,
    },

    /// A required argument failed local validation.
    #[error("{message}")]
    Validation {
        /// Error message.
        message: String,
    },

    /// The native core reported an error.
    #[error("{context}: [{code:?}] {message}")]
    Native {
        /// Native error code.
        code: ErrorCode,
        /// Native error message.
        message: String,
        /// What the bridge was doing.
        context: String,
    },

    /// The native core returned a payload of the wrong type.
    #[error("{context}: unexpected {found:?} result, expected {expected:?}")]
    UnexpectedResult {
        /// What the bridge was doing.
        context: String,
        /// Payload type the operation produces.
        expected: ResultDataType,
        /// Payload type actually returned.
        found: ResultDataType,
    },

    /// A document value could not be encoded, decoded or addressed.
    #[error("{context}: {source}")]
    Value {
        /// What the bridge was doing.
        context: String,
        /// Underlying value error.
        #[source]
        source: ValueError,
    },

    /// Native output could not be parsed.
    #[error("{context}: {message}")]
    Serialization {
        /// What the bridge was doing.
        context: String,
        /// Error message.
        message: String,
    },
}

impl SdkError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SdkError::Validation {
            message: message.into(),
        }
    }

    /// Creates a native error with context.
    pub fn native(code: ErrorCode, message: impl Into<String>, context: impl Into<String>) -> Self {
        SdkError::Native {
            code,
            message: message.into(),
            context: context.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(context: impl Into<String>, message: impl Into<String>) -> Self {
        SdkError::Serialization {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Wraps a value error with context.
    pub fn value(context: impl Into<String>, source: ValueError) -> Self {
        SdkError::Value {
            context: context.into(),
            source,
        }
    }

    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::ContextClosed => ErrorKind::ContextClosed,
            SdkError::NoHandle { .. } | SdkError::HandleMissing { .. } => ErrorKind::HandleMissing,
            SdkError::HandleReleased { .. } => ErrorKind::InvalidState,
            SdkError::Validation { .. } => ErrorKind::ValidationFailed,
            SdkError::Native { code, .. } => ErrorKind::from(*code),
            SdkError::UnexpectedResult { .. } => ErrorKind::ProtocolError,
            SdkError::Value { .. } | SdkError::Serialization { .. } => {
                ErrorKind::SerializationError
            }
        }
    }

    /// Returns the native error code, if the core produced this error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            SdkError::Native { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the native core reported `NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::InvalidParameter,
            ErrorCode::InvalidState,
            ErrorCode::NetworkError,
            ErrorCode::SerializationError,
            ErrorCode::ProtocolError,
            ErrorCode::CryptoError,
            ErrorCode::NotFound,
            ErrorCode::Timeout,
            ErrorCode::NotImplemented,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::from(i32::from(code)), code);
        }
    }

    #[test]
    fn unknown_code_is_internal() {
        assert_eq!(ErrorCode::from(42), ErrorCode::InternalError);
        assert_eq!(ErrorCode::from(-1), ErrorCode::InternalError);
    }

    #[test]
    fn messages() {
        assert_eq!(SdkError::ContextClosed.to_string(), "SDK is closed");
        assert_eq!(
            SdkError::HandleMissing {
                entity: "document",
                operation: "put".into(),
            }
            .to_string(),
            "cannot put document without handle - document was created from search results"
        );
        assert_eq!(
            SdkError::NoHandle { entity: "document" }.to_string(),
            "document has no handle - created from search results"
        );
        assert_eq!(
            SdkError::native(ErrorCode::NotFound, "identity not found", "failed to fetch identity")
                .to_string(),
            "failed to fetch identity: [NotFound] identity not found"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(SdkError::ContextClosed.kind(), ErrorKind::ContextClosed);
        assert_eq!(
            SdkError::validation("signing identity is required").kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(
            SdkError::HandleReleased {
                entity: "identity",
                operation: "get info".into(),
            }
            .kind(),
            ErrorKind::InvalidState
        );
        let err = SdkError::native(ErrorCode::Timeout, "deadline", "failed to put document");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.code(), Some(ErrorCode::Timeout));
        assert!(!err.kind().is_local());
        assert!(ErrorKind::HandleMissing.is_local());
    }
}
