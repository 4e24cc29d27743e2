//! In-process reference core.
//!
//! [`MockCore`] implements [`NativeCore`] over an in-memory platform. It
//! allocates real native strings, buffers and balance maps, and tracks every
//! live allocation and handle so tests can assert that the bridge frees each
//! exactly once.
//!
//! ```
//! use platsdk_bridge::{MockCore, Sdk, SdkConfig};
//! use std::sync::Arc;
//!
//! let core = Arc::new(MockCore::new());
//! let sdk = Sdk::open(core.clone(), SdkConfig::default()).unwrap();
//! let mut identity = sdk.identities().create().unwrap();
//! assert_eq!(identity.balance().unwrap(), MockCore::DEFAULT_IDENTITY_BALANCE);
//! drop(identity);
//! sdk.close();
//! assert_eq!(core.outstanding_allocations(), 0);
//! ```

mod query;
mod state;

use crate::error::ErrorCode;
use crate::id::IdentityId;
use crate::marshal::{BalanceEntry, NativeBalanceMap, NativeBuffer, NativeError, NativeString};
use crate::native::{
    NativeCore, RawConfig, RawDocumentCreateParams, RawDocumentInfo, RawDocumentPublish, RawHandle,
    RawIdentityInfo, RawPutSettings, RawResult, ResultData,
};
use parking_lot::Mutex;
use state::{Failure, HandleKind, MockState, Outcome, Payload, Released};
use std::collections::HashSet;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct Counters {
    boundary_calls: AtomicU64,
    init_calls: AtomicU64,
    sessions_created: AtomicU64,
    sessions_destroyed: AtomicU64,
    handles_destroyed: AtomicU64,
    double_frees: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of [`MockCore`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Calls that reached the core, excluding destroy and free calls.
    pub boundary_calls: u64,
    /// `init` calls.
    pub init_calls: u64,
    /// Sessions opened.
    pub sessions_created: u64,
    /// Sessions closed.
    pub sessions_destroyed: u64,
    /// Entity handles destroyed.
    pub handles_destroyed: u64,
    /// Destroy or free calls on something that was not live: double frees,
    /// foreign pointers and handles of the wrong kind.
    pub double_frees: u64,
}

/// An in-memory [`NativeCore`].
///
/// New identities start with [`MockCore::DEFAULT_IDENTITY_BALANCE`] credits.
/// Contracts and documents must be published before they can be fetched or
/// searched, and only their owner may publish them.
#[derive(Debug)]
pub struct MockCore {
    state: Mutex<MockState>,
    allocations: Mutex<HashSet<usize>>,
    pending: Mutex<Option<Failure>>,
    counters: Counters,
}

impl Default for MockCore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCore {
    /// Starting balance of new identities, in credits.
    pub const DEFAULT_IDENTITY_BALANCE: u64 = 10_000_000;
    /// Public keys on new identities.
    pub const DEFAULT_PUBLIC_KEYS: u32 = 3;

    /// Creates an empty platform.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::new(
                Self::DEFAULT_IDENTITY_BALANCE,
                Self::DEFAULT_PUBLIC_KEYS,
            )),
            allocations: Mutex::new(HashSet::new()),
            pending: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> MockStats {
        let c = &self.counters;
        MockStats {
            boundary_calls: c.boundary_calls.load(Ordering::Relaxed),
            init_calls: c.init_calls.load(Ordering::Relaxed),
            sessions_created: c.sessions_created.load(Ordering::Relaxed),
            sessions_destroyed: c.sessions_destroyed.load(Ordering::Relaxed),
            handles_destroyed: c.handles_destroyed.load(Ordering::Relaxed),
            double_frees: c.double_frees.load(Ordering::Relaxed),
        }
    }

    /// Number of live entity handles.
    pub fn live_handles(&self) -> usize {
        self.state.lock().live_handles()
    }

    /// Number of strings, buffers and balance maps not yet freed.
    pub fn outstanding_allocations(&self) -> usize {
        self.allocations.lock().len()
    }

    /// IDs of identities created so far, oldest first.
    pub fn identity_ids(&self) -> Vec<IdentityId> {
        self.state
            .lock()
            .identity_ids()
            .into_iter()
            .map(IdentityId::from_bytes)
            .collect()
    }

    /// Makes the next call that returns a result fail with `code`.
    pub fn fail_next(&self, code: ErrorCode, message: impl Into<String>) {
        *self.pending.lock() = Some(Failure::new(code, message));
    }

    /// Registers a handle of no particular entity. Any entity destroyer
    /// accepts it.
    pub fn register_opaque(&self) -> RawHandle {
        match self.state.lock().register_opaque() {
            Ok(handle) => handle,
            Err(failure) => panic!("{}", failure.message),
        }
    }

    /// Allocates a tracked native string. Interior NUL bytes yield a null
    /// string.
    pub fn alloc_string(&self, s: &str) -> NativeString {
        match NativeString::from_str(s) {
            Some(native) => {
                self.allocations.lock().insert(native.addr());
                native
            }
            None => NativeString::null(),
        }
    }

    /// Allocates a tracked byte buffer.
    pub fn alloc_bytes(&self, bytes: Vec<u8>) -> NativeBuffer {
        if bytes.is_empty() {
            return NativeBuffer::empty();
        }
        let buffer = NativeBuffer::from_vec(bytes);
        self.allocations.lock().insert(buffer.addr());
        buffer
    }

    /// Allocates a tracked error.
    pub fn alloc_error(&self, code: ErrorCode, message: &str) -> NativeError {
        NativeError {
            code: code.into(),
            message: self.alloc_string(message),
        }
    }

    fn alloc_balances(&self, entries: Vec<BalanceEntry>) -> NativeBalanceMap {
        let empty = entries.is_empty();
        let map = NativeBalanceMap::from_vec(entries);
        if !empty {
            self.allocations.lock().insert(map.addr());
        }
        map
    }

    /// Forgets a live allocation. Returns false, and counts a double free,
    /// if `addr` was not live.
    fn untrack(&self, addr: usize) -> bool {
        if self.allocations.lock().remove(&addr) {
            return true;
        }
        bump(&self.counters.double_frees);
        warn!(addr = format_args!("{addr:#x}"), "free of memory that is not live");
        false
    }

    fn call(&self, operation: &'static str, f: impl FnOnce(&mut MockState) -> Outcome<Payload>) -> RawResult {
        bump(&self.counters.boundary_calls);
        let pending = self.pending.lock().take();
        let outcome = match pending {
            Some(failure) => Err(failure),
            None => {
                let mut state = self.state.lock();
                f(&mut state)
            }
        };

        match outcome {
            Ok(payload) => RawResult::ok(self.deliver(payload)),
            Err(failure) => {
                trace!(operation, code = ?failure.code, message = %failure.message, "mock call failed");
                RawResult::err(self.alloc_error(failure.code, &failure.message))
            }
        }
    }

    fn deliver(&self, payload: Payload) -> ResultData {
        match payload {
            Payload::None => ResultData::None,
            Payload::Text(s) => ResultData::String(self.alloc_string(&s)),
            Payload::Bytes(b) => ResultData::BinaryData(self.alloc_bytes(b)),
            Payload::Session(h) => ResultData::Session(h),
            Payload::Identity(h) => ResultData::Identity(h),
            Payload::Contract(h) => ResultData::DataContract(h),
            Payload::Document(h) => ResultData::Document(h),
            Payload::Balances(entries) => ResultData::IdentityBalanceMap(self.alloc_balances(entries)),
        }
    }

    fn destroy(&self, handle: RawHandle, kind: HandleKind) {
        let released = self.state.lock().release(handle, kind);
        match (released, kind) {
            (Released::Freed, HandleKind::Session) => bump(&self.counters.sessions_destroyed),
            (Released::Freed, _) => bump(&self.counters.handles_destroyed),
            (Released::Missing | Released::WrongKind, _) => {
                bump(&self.counters.double_frees);
                warn!(?handle, ?kind, ?released, "destroy of a handle that is not live");
            }
        }
    }
}

impl NativeCore for MockCore {
    fn init(&self) {
        bump(&self.counters.init_calls);
        debug!("mock core initialized");
    }

    fn sdk_create(&self, config: &RawConfig<'_>) -> RawResult {
        self.call("sdk_create", |state| {
            if config.dapi_addresses.to_str().is_err() {
                return Err(Failure::invalid("endpoint list is not valid UTF-8"));
            }
            if config.request_timeout_ms == 0 {
                return Err(Failure::invalid("request timeout must be positive"));
            }
            let session = state.open_session()?;
            bump(&self.counters.sessions_created);
            Ok(session)
        })
    }

    fn sdk_destroy(&self, sdk: RawHandle) {
        self.destroy(sdk, HandleKind::Session);
    }

    fn identity_create(&self, sdk: RawHandle) -> RawResult {
        self.call("identity_create", |state| state.create_identity(sdk))
    }

    fn identity_fetch(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult {
        self.call("identity_fetch", |state| state.fetch_identity(sdk, id))
    }

    fn identity_get_info(&self, identity: RawHandle) -> Option<RawIdentityInfo> {
        bump(&self.counters.boundary_calls);
        let summary = self.state.lock().identity_summary(identity)?;
        Some(RawIdentityInfo {
            id: self.alloc_string(&summary.id),
            balance: summary.balance,
            revision: summary.revision,
            public_keys_count: summary.public_keys,
        })
    }

    fn identity_info_free(&self, info: RawIdentityInfo) {
        self.string_free(info.id);
    }

    fn identity_fetch_balance(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult {
        self.call("identity_fetch_balance", |state| state.identity_balance(sdk, id))
    }

    fn identities_fetch_balances(&self, sdk: RawHandle, ids: &[[u8; 32]]) -> RawResult {
        self.call("identities_fetch_balances", |state| state.identity_balances(sdk, ids))
    }

    fn identity_transfer_credits(
        &self,
        sdk: RawHandle,
        from: RawHandle,
        to: &[u8; 32],
        amount: u64,
        _settings: &RawPutSettings,
    ) -> RawResult {
        self.call("identity_transfer_credits", |state| {
            state.transfer_credits(sdk, from, to, amount)
        })
    }

    fn identity_destroy(&self, identity: RawHandle) {
        self.destroy(identity, HandleKind::Identity);
    }

    fn data_contract_create(&self, sdk: RawHandle, owner: RawHandle, schemas_json: &CStr) -> RawResult {
        self.call("data_contract_create", |state| {
            state.create_contract(sdk, owner, schemas_json)
        })
    }

    fn data_contract_fetch(&self, sdk: RawHandle, id: &[u8; 32]) -> RawResult {
        self.call("data_contract_fetch", |state| state.fetch_contract(sdk, id))
    }

    fn data_contract_get_info(&self, contract: RawHandle) -> RawResult {
        self.call("data_contract_get_info", |state| state.contract_info(contract))
    }

    fn data_contract_get_schema(&self, contract: RawHandle, document_type: &CStr) -> RawResult {
        self.call("data_contract_get_schema", |state| {
            state.contract_schema(contract, document_type)
        })
    }

    fn data_contract_serialize(&self, contract: RawHandle) -> RawResult {
        self.call("data_contract_serialize", |state| state.serialize_contract(contract))
    }

    fn data_contract_put_to_platform(
        &self,
        sdk: RawHandle,
        contract: RawHandle,
        signer: RawHandle,
        _settings: &RawPutSettings,
        _wait: bool,
    ) -> RawResult {
        self.call("data_contract_put_to_platform", |state| {
            state.publish_contract(sdk, contract, signer)
        })
    }

    fn data_contract_destroy(&self, contract: RawHandle) {
        self.destroy(contract, HandleKind::Contract);
    }

    fn document_create(&self, sdk: RawHandle, params: &RawDocumentCreateParams<'_>) -> RawResult {
        self.call("document_create", |state| state.create_document(sdk, params))
    }

    fn document_fetch(
        &self,
        sdk: RawHandle,
        data_contract: RawHandle,
        document_type: &CStr,
        id: &[u8; 32],
    ) -> RawResult {
        self.call("document_fetch", |state| {
            state.fetch_document(sdk, data_contract, document_type, id)
        })
    }

    fn document_get_info(&self, document: RawHandle) -> Option<RawDocumentInfo> {
        bump(&self.counters.boundary_calls);
        let summary = self.state.lock().document_summary(document)?;
        Some(RawDocumentInfo {
            id: self.alloc_string(&summary.id),
            owner_id: self.alloc_string(&summary.owner_id),
            data_contract_id: self.alloc_string(&summary.data_contract_id),
            document_type: self.alloc_string(&summary.document_type),
            revision: summary.revision,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            data_json: self.alloc_string(&summary.data_json),
        })
    }

    fn document_info_free(&self, info: RawDocumentInfo) {
        self.string_free(info.id);
        self.string_free(info.owner_id);
        self.string_free(info.data_contract_id);
        self.string_free(info.document_type);
        self.string_free(info.data_json);
    }

    fn document_set_properties(&self, document: RawHandle, properties_json: &CStr) -> RawResult {
        self.call("document_set_properties", |state| {
            state.set_properties(document, properties_json)
        })
    }

    fn document_set_property(&self, document: RawHandle, path: &CStr, value_json: &CStr) -> RawResult {
        self.call("document_set_property", |state| {
            state.set_property(document, path, value_json)
        })
    }

    fn document_remove_property(&self, document: RawHandle, path: &CStr) -> RawResult {
        self.call("document_remove_property", |state| state.remove_property(document, path))
    }

    fn document_search(
        &self,
        sdk: RawHandle,
        data_contract: RawHandle,
        document_type: &CStr,
        query_json: &CStr,
    ) -> RawResult {
        self.call("document_search", |state| {
            state.search(sdk, data_contract, document_type, query_json)
        })
    }

    fn document_put_to_platform(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult {
        self.call("document_put_to_platform", |state| state.put_document(sdk, publish))
    }

    fn document_replace_on_platform(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult {
        self.call("document_replace_on_platform", |state| {
            state.replace_document(sdk, publish)
        })
    }

    fn document_delete(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult {
        self.call("document_delete", |state| state.delete_document(sdk, publish))
    }

    fn document_transfer_to_identity(
        &self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
        recipient: &[u8; 32],
    ) -> RawResult {
        self.call("document_transfer_to_identity", |state| {
            state.transfer_document(sdk, publish, recipient)
        })
    }

    fn document_purchase(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> RawResult {
        self.call("document_purchase", |state| state.purchase_document(sdk, publish))
    }

    fn document_update_price(&self, sdk: RawHandle, publish: &RawDocumentPublish<'_>, price: u64) -> RawResult {
        self.call("document_update_price", |state| {
            state.update_document_price(sdk, publish, price)
        })
    }

    fn document_destroy(&self, sdk: RawHandle, document: RawHandle, _settings: &RawPutSettings) -> RawResult {
        self.call("document_destroy", |state| state.destroy_document(sdk, document))
    }

    fn document_handle_destroy(&self, document: RawHandle) {
        self.destroy(document, HandleKind::Document);
    }

    fn string_free(&self, s: NativeString) {
        if s.is_null() || !self.untrack(s.addr()) {
            return;
        }
        // SAFETY: the address was live in our table, so `s` came from
        // `NativeString::from_str` in `alloc_string` and is freed only here.
        unsafe { s.reclaim() }
    }

    fn bytes_free(&self, b: NativeBuffer) {
        if b.is_null() || !self.untrack(b.addr()) {
            return;
        }
        // SAFETY: as for strings; `b` came from `NativeBuffer::from_vec`.
        unsafe { b.reclaim() }
    }

    fn balance_map_free(&self, map: NativeBalanceMap) {
        if map.count != 0 && !self.untrack(map.addr()) {
            return;
        }
        // SAFETY: `map` came from `NativeBalanceMap::from_vec`. Empty maps
        // are never tracked and reclaiming them frees nothing.
        unsafe { map.reclaim() }
    }

    fn error_free(&self, error: NativeError) {
        self.string_free(error.message);
    }
}
