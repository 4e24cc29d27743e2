//! The native core contract.
//!
//! [`NativeCore`] is the full set of entry points the bridge calls. A core
//! allocates every handle, string, buffer and balance map it returns, and
//! releases them when the bridge hands them back through the matching
//! destroy or free function. Text arguments are borrowed for the duration of
//! one call only.

use crate::marshal::{NativeBalanceMap, NativeBuffer, NativeError, NativeString};
use std::ffi::{c_void, CStr};
use std::fmt;
use std::ptr::NonNull;

/// An opaque reference to an object owned by the native core.
///
/// Never dereferenced on the host side.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// SAFETY: the handle is an opaque token. The core is required to be
// `Send + Sync`, and all access to the pointee happens inside it.
unsafe impl Send for RawHandle {}
// SAFETY: see above.
unsafe impl Sync for RawHandle {}

impl RawHandle {
    /// Wraps a native pointer. Returns `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Builds a handle from an address. Returns `None` for zero.
    pub fn from_addr(addr: usize) -> Option<Self> {
        Self::from_ptr(addr as *mut c_void)
    }

    /// Returns the pointer.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Returns the address.
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.addr())
    }
}

/// Tag describing the payload of a [`RawResult`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultDataType {
    /// No payload.
    None = 0,
    /// A native string.
    String = 1,
    /// A native byte buffer.
    BinaryData = 2,
    /// An identity handle.
    IdentityHandle = 3,
    /// A document handle.
    DocumentHandle = 4,
    /// A data contract handle.
    DataContractHandle = 5,
    /// A batch of identity balances.
    IdentityBalanceMap = 6,
    /// An SDK session handle.
    SessionHandle = 7,
}

/// Payload of a successful native call.
#[derive(Debug)]
pub enum ResultData {
    /// No payload.
    None,
    /// Text, usually JSON.
    String(NativeString),
    /// Raw bytes.
    BinaryData(NativeBuffer),
    /// A new SDK session.
    Session(RawHandle),
    /// A new identity handle.
    Identity(RawHandle),
    /// A new document handle.
    Document(RawHandle),
    /// A new data contract handle.
    DataContract(RawHandle),
    /// Identity balances.
    IdentityBalanceMap(NativeBalanceMap),
}

impl ResultData {
    /// Returns the payload tag.
    pub fn data_type(&self) -> ResultDataType {
        match self {
            ResultData::None => ResultDataType::None,
            ResultData::String(_) => ResultDataType::String,
            ResultData::BinaryData(_) => ResultDataType::BinaryData,
            ResultData::Session(_) => ResultDataType::SessionHandle,
            ResultData::Identity(_) => ResultDataType::IdentityHandle,
            ResultData::Document(_) => ResultDataType::DocumentHandle,
            ResultData::DataContract(_) => ResultDataType::DataContractHandle,
            ResultData::IdentityBalanceMap(_) => ResultDataType::IdentityBalanceMap,
        }
    }
}

/// Outcome of a native call: a payload, or an error.
///
/// A result carrying an error should carry `ResultData::None`; the bridge
/// releases any payload that comes with an error.
#[derive(Debug)]
#[must_use]
pub struct RawResult {
    /// Payload.
    pub data: ResultData,
    /// Error, if the call failed.
    pub error: Option<NativeError>,
}

impl RawResult {
    /// A successful result.
    pub fn ok(data: ResultData) -> Self {
        Self { data, error: None }
    }

    /// A successful result with no payload.
    pub fn none() -> Self {
        Self::ok(ResultData::None)
    }

    /// A failed result.
    pub fn err(error: NativeError) -> Self {
        Self {
            data: ResultData::None,
            error: Some(error),
        }
    }

    /// Returns true if the call failed.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// Network selector passed to `sdk_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawNetwork {
    /// Production network.
    Mainnet = 0,
    /// Public test network.
    Testnet = 1,
    /// Development network.
    Devnet = 2,
    /// Local network.
    Local = 3,
}

/// Session configuration passed to `sdk_create`.
#[derive(Debug, Clone, Copy)]
pub struct RawConfig<'a> {
    /// Network.
    pub network: RawNetwork,
    /// Comma-separated endpoint addresses. Empty selects the network default.
    pub dapi_addresses: &'a CStr,
    /// Retries per request.
    pub request_retry_count: u32,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// State-transition wait timeout in milliseconds.
    pub wait_timeout_ms: u64,
    /// Fee multiplier increase in percent.
    pub user_fee_increase: u16,
    /// Sign with keys of any security level.
    pub allow_signing_with_any_security_level: bool,
    /// Sign with keys of any purpose.
    pub allow_signing_with_any_purpose: bool,
}

/// Per-call broadcast settings. All zeros means "use core defaults".
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawPutSettings {
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries.
    pub retries: u32,
    /// Ban addresses that failed.
    pub ban_failed_address: bool,
    /// Identity nonce stale time in seconds.
    pub identity_nonce_stale_time_s: u64,
    /// Fee multiplier increase in percent.
    pub user_fee_increase: u16,
    /// Sign with keys of any security level.
    pub allow_signing_with_any_security_level: bool,
    /// Sign with keys of any purpose.
    pub allow_signing_with_any_purpose: bool,
    /// State-transition wait timeout in milliseconds.
    pub wait_timeout_ms: u64,
}

/// Who pays gas fees for a token-priced operation.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RawGasFeesPaidBy {
    /// The document owner.
    #[default]
    DocumentOwner = 0,
    /// The contract owner.
    ContractOwner = 1,
    /// The contract owner if possible, otherwise the document owner.
    PreferContractOwner = 2,
}

/// Token payment for a document operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawTokenPaymentInfo {
    /// Contract of the payment token. `None` means the document's contract.
    pub payment_token_contract_id: Option<[u8; 32]>,
    /// Token position within its contract.
    pub token_contract_position: u16,
    /// Minimum accepted cost. Zero means no minimum.
    pub minimum_token_cost: u64,
    /// Maximum accepted cost. Zero means no maximum.
    pub maximum_token_cost: u64,
    /// Who pays gas fees.
    pub gas_fees_paid_by: RawGasFeesPaidBy,
}

/// Arguments of `document_create`.
#[derive(Debug, Clone, Copy)]
pub struct RawDocumentCreateParams<'a> {
    /// Contract defining the document type.
    pub data_contract: RawHandle,
    /// Document type name.
    pub document_type: &'a CStr,
    /// Owning identity.
    pub owner_identity: RawHandle,
    /// Initial properties as a JSON object.
    pub properties_json: &'a CStr,
}

/// Shared arguments of document state transitions.
#[derive(Debug, Clone, Copy)]
pub struct RawDocumentPublish<'a> {
    /// Document being published.
    pub document: RawHandle,
    /// Contract, for operations that need it.
    pub data_contract: Option<RawHandle>,
    /// Signing identity (the purchaser, for purchases).
    pub signer: RawHandle,
    /// Broadcast settings.
    pub settings: &'a RawPutSettings,
    /// Token payment, if the operation is token-priced.
    pub token_payment: Option<&'a RawTokenPaymentInfo>,
    /// Wait for the platform to confirm the transition.
    pub wait: bool,
}

/// Identity summary returned by `identity_get_info`.
///
/// Release with `NativeCore::identity_info_free`.
#[repr(C)]
#[derive(Debug)]
pub struct RawIdentityInfo {
    /// Identity ID as hex.
    pub id: NativeString,
    /// Balance in credits.
    pub balance: u64,
    /// Revision.
    pub revision: u64,
    /// Number of public keys.
    pub public_keys_count: u32,
}

/// Document summary returned by `document_get_info`.
///
/// Release with `NativeCore::document_info_free`.
#[repr(C)]
#[derive(Debug)]
pub struct RawDocumentInfo {
    /// Document ID as hex.
    pub id: NativeString,
    /// Owner ID as hex.
    pub owner_id: NativeString,
    /// Contract ID as hex.
    pub data_contract_id: NativeString,
    /// Document type name.
    pub document_type: NativeString,
    /// Revision.
    pub revision: u64,
    /// Creation time in milliseconds since the epoch. Zero if unknown.
    pub created_at: i64,
    /// Update time in milliseconds since the epoch. Zero if unknown.
    pub updated_at: i64,
    /// Properties as a JSON object.
    pub data_json: NativeString,
}

/// Entry points of the native core.
///
/// Functions returning [`RawResult`] report failures in-band. Handles passed
/// in are always live handles previously returned by the same core.
pub trait NativeCore: Send + Sync {
    /// One-time process initialization.
    fn init(&self);

    /// Opens a session. Produces `Session`.
    fn sdk_create(&self, config: &RawConfig<'_>) -> RawResult;
    /// Closes a session.
    fn sdk_destroy(&self, sdk: RawHandle);

    /// Creates a new identity. Produces `Identity`.
    fn identity_create(&self, sdk: RawHandle) -> RawResult;
    /// Fetches an identity. Produces `Identity`.
    fn identity_fetch(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult;
    /// Reads identity info. `None` on failure.
    fn identity_get_info(&self, identity: RawHandle) -> Option<RawIdentityInfo>;
    /// Releases identity info.
    fn identity_info_free(&self, info: RawIdentityInfo);
    /// Fetches a balance. Produces a decimal `String`.
    fn identity_fetch_balance(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult;
    /// Fetches balances for many identities. Produces `IdentityBalanceMap`.
    fn identities_fetch_balances(&self, sdk: RawHandle, ids: &[[u8; 32]]) -> RawResult;
    /// Transfers credits. Produces a JSON `String` with both new balances.
    fn identity_transfer_credits(
        &self,
        sdk: RawHandle,
        from: RawHandle,
        to: &[u8; 32],
        amount: u64,
        settings: &RawPutSettings,
    ) -> RawResult;
    /// Releases an identity handle.
    fn identity_destroy(&self, identity: RawHandle);

    /// Creates a contract from document schemas. Produces `DataContract`.
    fn data_contract_create(&self, sdk: RawHandle, owner: RawHandle, schemas_json: &CStr)
        -> RawResult;
    /// Fetches a contract. Produces `DataContract`.
    fn data_contract_fetch(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult;
    /// Reads contract info. Produces a JSON `String`.
    fn data_contract_get_info(&self, contract: RawHandle) -> RawResult;
    /// Reads one document type's schema. Produces a JSON `String`.
    fn data_contract_get_schema(&self, contract: RawHandle, document_type: &CStr) -> RawResult;
    /// Serializes a contract. Produces `BinaryData`.
    fn data_contract_serialize(&self, contract: RawHandle) -> RawResult;
    /// Publishes a contract. Produces `None`.
    fn data_contract_put_to_platform(
        &self,
        sdk: RawHandle,
        contract: RawHandle,
        signer: RawHandle,
        settings: &RawPutSettings,
        wait: bool,
    ) -> RawResult;
    /// Releases a contract handle.
    fn data_contract_destroy(&self, contract: RawHandle);

    /// Creates a local document. Produces `Document`.
    fn document_create(&self, sdk: RawHandle, params: &RawDocumentCreateParams<'_>) -> RawResult;
    /// Fetches a published document. Produces `Document`.
    fn document_fetch(
        &self,
        sdk: RawHandle,
        contract: RawHandle,
        document_type: &CStr,
        document_id: &[u8; 32],
    ) -> RawResult;
    /// Reads document info. `None` on failure.
    fn document_get_info(&self, document: RawHandle) -> Option<RawDocumentInfo>;
    /// Releases document info.
    fn document_info_free(&self, info: RawDocumentInfo);
    /// Replaces all properties. Produces `None`.
    fn document_set_properties(&self, document: RawHandle, properties_json: &CStr) -> RawResult;
    /// Sets one property by dotted path. Produces `None`.
    fn document_set_property(&self, document: RawHandle, path: &CStr, value_json: &CStr)
        -> RawResult;
    /// Removes one property by dotted path. Produces `None`.
    fn document_remove_property(&self, document: RawHandle, path: &CStr) -> RawResult;
    /// Searches documents. Produces a JSON `String` of
    /// `{"documents": [...], "total_count": n}`.
    fn document_search(
        &self,
        sdk: RawHandle,
        contract: RawHandle,
        document_type: &CStr,
        query_json: &CStr,
    ) -> RawResult;
    /// Publishes a new document. Produces `None`.
    fn document_put_to_platform(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>)
        -> RawResult;
    /// Replaces a published document. Produces `None`.
    fn document_replace_on_platform(
        &self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
    ) -> RawResult;
    /// Deletes a published document. Produces `None`.
    fn document_delete(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult;
    /// Transfers ownership. Produces a JSON `String` describing the transfer.
    fn document_transfer_to_identity(
        &self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
        recipient: &[u8; 32],
    ) -> RawResult;
    /// Buys a document at its listed price. Produces `None`.
    fn document_purchase(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult;
    /// Lists a document for sale. Produces `None`.
    fn document_update_price(
        &self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
        price: u64,
    ) -> RawResult;
    /// Removes a published document without a signer. Produces `None`.
    fn document_destroy(&self, sdk: RawHandle, document: RawHandle, settings: &RawPutSettings)
        -> RawResult;
    /// Releases a document handle.
    fn document_handle_destroy(&self, document: RawHandle);

    /// Frees a string returned by the core.
    fn string_free(&self, s: NativeString);
    /// Frees a buffer returned by the core.
    fn bytes_free(&self, b: NativeBuffer);
    /// Frees a balance map returned by the core.
    fn balance_map_free(&self, map: NativeBalanceMap);
    /// Frees an error returned by the core.
    fn error_free(&self, error: NativeError);
}
