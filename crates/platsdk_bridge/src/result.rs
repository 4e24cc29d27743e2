//! Decoding of native call outcomes.
//!
//! Every function here consumes a [`RawResult`] and returns each native
//! allocation in it to the core exactly once, whether decoding succeeds or
//! not.

use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::marshal::{take_string, BalanceEntry, NativeError, Owned};
use crate::native::{NativeCore, RawHandle, RawResult, ResultData, ResultDataType};
use tracing::trace;

/// Releases a payload the caller does not want.
fn discard(core: &dyn NativeCore, data: ResultData) {
    match data {
        ResultData::None => {}
        ResultData::String(s) => drop(Owned::new(core, s)),
        ResultData::BinaryData(b) => drop(Owned::new(core, b)),
        ResultData::IdentityBalanceMap(m) => drop(Owned::new(core, m)),
        ResultData::Session(h) => core.sdk_destroy(h),
        ResultData::Identity(h) => core.identity_destroy(h),
        ResultData::Document(h) => core.document_handle_destroy(h),
        ResultData::DataContract(h) => core.data_contract_destroy(h),
    }
}

fn native_error(core: &dyn NativeCore, error: NativeError, context: &str) -> SdkError {
    let error = Owned::new(core, error);
    let code = ErrorCode::from(error.code);
    let message = match crate::marshal::read_string(&error.message, context) {
        Ok(Some(message)) => message,
        Ok(None) => "unknown error".to_string(),
        Err(_) => "error message is not valid UTF-8".to_string(),
    };
    trace!(?code, %message, context, "native call failed");
    SdkError::native(code, message, context)
}

/// Splits a result into its payload or a contextualized error.
pub(crate) fn decode(core: &dyn NativeCore, raw: RawResult, context: &str) -> SdkResult<ResultData> {
    let RawResult { data, error } = raw;
    match error {
        Some(error) => {
            discard(core, data);
            Err(native_error(core, error, context))
        }
        None => Ok(data),
    }
}

fn unexpected(core: &dyn NativeCore, data: ResultData, expected: ResultDataType, context: &str) -> SdkError {
    let found = data.data_type();
    discard(core, data);
    SdkError::UnexpectedResult {
        context: context.to_string(),
        expected,
        found,
    }
}

/// Expects a call with no payload.
pub(crate) fn expect_none(core: &dyn NativeCore, raw: RawResult, context: &str) -> SdkResult<()> {
    match decode(core, raw, context)? {
        ResultData::None => Ok(()),
        other => Err(unexpected(core, other, ResultDataType::None, context)),
    }
}

/// Expects a string payload. A null string is a protocol error.
pub(crate) fn expect_string(core: &dyn NativeCore, raw: RawResult, context: &str) -> SdkResult<String> {
    match decode(core, raw, context)? {
        ResultData::String(s) => take_string(core, s, context)?.ok_or_else(|| {
            SdkError::native(ErrorCode::ProtocolError, "native core returned a null string", context)
        }),
        other => Err(unexpected(core, other, ResultDataType::String, context)),
    }
}

/// Expects a byte payload.
pub(crate) fn expect_bytes(core: &dyn NativeCore, raw: RawResult, context: &str) -> SdkResult<Vec<u8>> {
    match decode(core, raw, context)? {
        ResultData::BinaryData(b) => {
            let owned = Owned::new(core, b);
            // SAFETY: the buffer stays live until `owned` is dropped.
            Ok(unsafe { owned.as_slice() }.to_vec())
        }
        other => Err(unexpected(core, other, ResultDataType::BinaryData, context)),
    }
}

/// Expects a balance map payload.
pub(crate) fn expect_balances(
    core: &dyn NativeCore,
    raw: RawResult,
    context: &str,
) -> SdkResult<Vec<BalanceEntry>> {
    match decode(core, raw, context)? {
        ResultData::IdentityBalanceMap(m) => {
            let owned = Owned::new(core, m);
            // SAFETY: the entries stay live until `owned` is dropped.
            Ok(unsafe { owned.as_slice() }.to_vec())
        }
        other => Err(unexpected(core, other, ResultDataType::IdentityBalanceMap, context)),
    }
}

/// Expects a handle of the given type. Ownership passes to the caller.
pub(crate) fn expect_handle(
    core: &dyn NativeCore,
    raw: RawResult,
    expected: ResultDataType,
    context: &str,
) -> SdkResult<RawHandle> {
    let data = decode(core, raw, context)?;
    let handle = match (&data, expected) {
        (ResultData::Session(h), ResultDataType::SessionHandle)
        | (ResultData::Identity(h), ResultDataType::IdentityHandle)
        | (ResultData::Document(h), ResultDataType::DocumentHandle)
        | (ResultData::DataContract(h), ResultDataType::DataContractHandle) => Some(*h),
        _ => None,
    };
    handle.ok_or_else(|| unexpected(core, data, expected, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::marshal::{NativeBuffer, NativeString};
    use crate::mock::MockCore;

    fn error_result(mock: &MockCore, code: ErrorCode, message: &str) -> RawResult {
        RawResult::err(mock.alloc_error(code, message))
    }

    #[test]
    fn error_is_wrapped_and_freed() {
        let mock = MockCore::new();
        let raw = error_result(&mock, ErrorCode::NotFound, "identity not found");

        let err = expect_none(&mock, raw, "failed to fetch identity").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "failed to fetch identity: [NotFound] identity not found"
        );
        assert_eq!(mock.outstanding_allocations(), 0);
    }

    #[test]
    fn string_payload_is_copied_and_freed() {
        let mock = MockCore::new();
        let raw = RawResult::ok(ResultData::String(mock.alloc_string("{\"a\":1}")));

        assert_eq!(expect_string(&mock, raw, "ctx").unwrap(), "{\"a\":1}");
        assert_eq!(mock.outstanding_allocations(), 0);
    }

    #[test]
    fn null_string_is_protocol_error() {
        let mock = MockCore::new();
        let raw = RawResult::ok(ResultData::String(NativeString::null()));
        let err = expect_string(&mock, raw, "ctx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolError);
    }

    #[test]
    fn mismatched_payload_is_released() {
        let mock = MockCore::new();
        let raw = RawResult::ok(ResultData::String(mock.alloc_string("oops")));

        let err = expect_bytes(&mock, raw, "ctx").unwrap_err();
        assert!(matches!(
            err,
            SdkError::UnexpectedResult {
                expected: ResultDataType::BinaryData,
                found: ResultDataType::String,
                ..
            }
        ));
        assert_eq!(mock.outstanding_allocations(), 0);
    }

    #[test]
    fn payload_with_error_is_released() {
        let mock = MockCore::new();
        let raw = RawResult {
            data: ResultData::BinaryData(mock.alloc_bytes(vec![1, 2, 3])),
            error: Some(mock.alloc_error(ErrorCode::Timeout, "slow")),
        };
        let err = expect_bytes(&mock, raw, "ctx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mock.outstanding_allocations(), 0);
    }

    #[test]
    fn empty_buffer_reads_empty() {
        let mock = MockCore::new();
        let raw = RawResult::ok(ResultData::BinaryData(NativeBuffer::empty()));
        assert!(expect_bytes(&mock, raw, "ctx").unwrap().is_empty());
    }
}
