//! Memory crossing the native boundary.
//!
//! Ownership rules:
//! - `Native*` values are allocated by the native core. The bridge reads them
//!   and returns each one to the core's matching free function exactly once,
//!   normally through an [`Owned`] guard.
//! - Text passed into the core is a [`CString`] owned by the bridge; the core
//!   only borrows it for the duration of the call.

use crate::error::{SdkError, SdkResult};
use crate::native::{NativeCore, RawDocumentInfo, RawIdentityInfo};
use std::ffi::{c_char, CStr, CString};
use std::mem::ManuallyDrop;

/// A string allocated by the native core.
///
/// Null-terminated UTF-8. Release with `NativeCore::string_free`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeString {
    /// Pointer to null-terminated string.
    pub ptr: *mut c_char,
    /// Length (not including null terminator).
    pub len: usize,
}

impl NativeString {
    /// Allocates a native string from a Rust string.
    ///
    /// Intended for core implementations. Returns `None` if `s` contains an
    /// interior NUL byte. Memory must be returned with [`NativeString::reclaim`].
    pub fn from_str(s: &str) -> Option<Self> {
        let cstring = CString::new(s).ok()?;
        let len = cstring.as_bytes().len();
        let ptr = cstring.into_raw();

        Some(Self { ptr, len })
    }

    /// Creates a null string.
    pub fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Returns true if the string is null.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Address of the allocation, for bookkeeping.
    pub fn addr(&self) -> usize {
        self.ptr as usize
    }

    /// Converts to a Rust string slice.
    ///
    /// Returns `None` for a null pointer or invalid UTF-8.
    ///
    /// # Safety
    ///
    /// A non-null pointer must point to a live null-terminated allocation.
    pub unsafe fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let cstr = CStr::from_ptr(self.ptr);
        cstr.to_str().ok()
    }

    /// Frees a string created by [`NativeString::from_str`].
    ///
    /// # Safety
    ///
    /// The string must come from `from_str` and must not have been reclaimed.
    pub unsafe fn reclaim(self) {
        if !self.ptr.is_null() {
            drop(CString::from_raw(self.ptr));
        }
    }
}

/// A byte buffer allocated by the native core.
///
/// Release with `NativeCore::bytes_free`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeBuffer {
    /// Pointer to data.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl NativeBuffer {
    /// Creates a new buffer from a Vec.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let mut boxed = vec.into_boxed_slice();
        let data = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);

        Self {
            data,
            len,
            capacity: len,
        }
    }

    /// Creates an empty buffer.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Returns true if the buffer is null/empty.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Address of the allocation, for bookkeeping.
    pub fn addr(&self) -> usize {
        self.data as usize
    }

    /// Views the bytes.
    ///
    /// # Safety
    ///
    /// A non-null pointer must be valid for `len` bytes.
    pub unsafe fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.data, self.len)
    }

    /// Frees a buffer created by [`NativeBuffer::from_vec`].
    ///
    /// # Safety
    ///
    /// The buffer must come from `from_vec` and must not have been reclaimed.
    pub unsafe fn reclaim(self) {
        if !self.data.is_null() {
            drop(Vec::from_raw_parts(self.data, self.len, self.capacity));
        }
    }
}

/// One entry of a batch balance lookup.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Identity ID (32 bytes).
    pub identity_id: [u8; 32],
    /// Balance in credits. `u64::MAX` means the identity was not found.
    pub balance: u64,
}

impl BalanceEntry {
    /// Balance value that encodes "identity not found".
    pub const NOT_FOUND: u64 = u64::MAX;
}

/// An array of balance entries allocated by the native core.
///
/// Release with `NativeCore::balance_map_free`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeBalanceMap {
    /// Pointer to the first entry.
    pub entries: *mut BalanceEntry,
    /// Number of entries.
    pub count: usize,
}

impl NativeBalanceMap {
    /// Allocates a map from a Vec.
    pub fn from_vec(entries: Vec<BalanceEntry>) -> Self {
        let mut boxed = entries.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let count = boxed.len();
        std::mem::forget(boxed);

        Self {
            entries: ptr,
            count,
        }
    }

    /// Address of the allocation, for bookkeeping.
    pub fn addr(&self) -> usize {
        self.entries as usize
    }

    /// Views the entries.
    ///
    /// # Safety
    ///
    /// A non-null pointer must be valid for `count` entries.
    pub unsafe fn as_slice(&self) -> &[BalanceEntry] {
        if self.entries.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.entries, self.count)
    }

    /// Frees a map created by [`NativeBalanceMap::from_vec`].
    ///
    /// # Safety
    ///
    /// The map must come from `from_vec` and must not have been reclaimed.
    pub unsafe fn reclaim(self) {
        if !self.entries.is_null() {
            let slice = std::ptr::slice_from_raw_parts_mut(self.entries, self.count);
            drop(Box::from_raw(slice));
        }
    }
}

/// Error information produced by the native core.
///
/// Release with `NativeCore::error_free`.
#[repr(C)]
#[derive(Debug)]
pub struct NativeError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: NativeString,
}

/// Native memory that must be handed back to the core.
pub(crate) trait NativeAlloc {
    fn free(self, core: &dyn NativeCore);
}

impl NativeAlloc for NativeString {
    fn free(self, core: &dyn NativeCore) {
        if !self.is_null() {
            core.string_free(self);
        }
    }
}

impl NativeAlloc for NativeBuffer {
    fn free(self, core: &dyn NativeCore) {
        if !self.is_null() {
            core.bytes_free(self);
        }
    }
}

impl NativeAlloc for NativeBalanceMap {
    fn free(self, core: &dyn NativeCore) {
        core.balance_map_free(self);
    }
}

impl NativeAlloc for NativeError {
    fn free(self, core: &dyn NativeCore) {
        core.error_free(self);
    }
}

impl NativeAlloc for RawIdentityInfo {
    fn free(self, core: &dyn NativeCore) {
        core.identity_info_free(self);
    }
}

impl NativeAlloc for RawDocumentInfo {
    fn free(self, core: &dyn NativeCore) {
        core.document_info_free(self);
    }
}

/// Scoped ownership of native memory.
///
/// Returns the value to the core when dropped, so every path out of a
/// decoding function frees it exactly once.
pub(crate) struct Owned<'a, T: NativeAlloc> {
    core: &'a dyn NativeCore,
    value: ManuallyDrop<T>,
}

impl<'a, T: NativeAlloc> Owned<'a, T> {
    pub(crate) fn new(core: &'a dyn NativeCore, value: T) -> Self {
        Self {
            core,
            value: ManuallyDrop::new(value),
        }
    }
}

impl<T: NativeAlloc> std::ops::Deref for Owned<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: NativeAlloc> Drop for Owned<'_, T> {
    fn drop(&mut self) {
        // SAFETY: `value` is taken once, here, and never touched again.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };
        value.free(self.core);
    }
}

/// Copies a native string into an owned Rust string.
///
/// A null pointer reads as `None`; invalid UTF-8 is a serialization error.
pub(crate) fn read_string(s: &NativeString, what: &str) -> SdkResult<Option<String>> {
    if s.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null native strings are live until freed, and the caller
    // still owns `s`.
    match unsafe { s.as_str() } {
        Some(text) => Ok(Some(text.to_owned())),
        None => Err(SdkError::serialization(
            what,
            "native string is not valid UTF-8",
        )),
    }
}

/// Reads and frees a native string in one step.
pub(crate) fn take_string(
    core: &dyn NativeCore,
    s: NativeString,
    what: &str,
) -> SdkResult<Option<String>> {
    let owned = Owned::new(core, s);
    read_string(&owned, what)
}

/// Converts host text into a borrowed C string for one native call.
///
/// `what` names the argument in the error message.
pub(crate) fn host_string(s: &str, what: &str) -> SdkResult<CString> {
    CString::new(s).map_err(|_| SdkError::validation(format!("{what} contains a NUL byte")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_from_vec() {
        let data = vec![1u8, 2, 3, 4, 5];
        let buffer = NativeBuffer::from_vec(data.clone());

        assert!(!buffer.is_null());
        assert_eq!(buffer.len, 5);
        assert_eq!(unsafe { buffer.as_slice() }, &data[..]);

        unsafe { buffer.reclaim() };
    }

    #[test]
    fn buffer_empty() {
        let buffer = NativeBuffer::empty();
        assert!(buffer.is_null());
        assert_eq!(buffer.len, 0);
        assert!(unsafe { buffer.as_slice() }.is_empty());
    }

    #[test]
    fn string_from_str() {
        let string = NativeString::from_str("hello").unwrap();
        assert!(!string.is_null());
        assert_eq!(string.len, 5);

        let s = unsafe { string.as_str() };
        assert_eq!(s, Some("hello"));

        unsafe { string.reclaim() };
    }

    #[test]
    fn string_with_null_byte_fails() {
        assert!(NativeString::from_str("hello\0world").is_none());
    }

    #[test]
    fn null_string_reads_as_none() {
        assert_eq!(read_string(&NativeString::null(), "id").unwrap(), None);
    }

    #[test]
    fn balance_map_from_vec() {
        let entries = vec![
            BalanceEntry {
                identity_id: [1; 32],
                balance: 10,
            },
            BalanceEntry {
                identity_id: [2; 32],
                balance: BalanceEntry::NOT_FOUND,
            },
        ];
        let map = NativeBalanceMap::from_vec(entries.clone());
        assert_eq!(map.count, 2);
        assert_eq!(unsafe { map.as_slice() }, &entries[..]);
        unsafe { map.reclaim() };
    }

    #[test]
    fn host_string_rejects_nul() {
        assert!(host_string("note", "document type").is_ok());
        let err = host_string("no\0te", "document type").unwrap_err();
        assert_eq!(err.to_string(), "document type contains a NUL byte");
    }
}
