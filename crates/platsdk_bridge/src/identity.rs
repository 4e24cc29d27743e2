//! Identities.

use crate::context::Sdk;
use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::handle::{EntityKind, OwnedHandle, PlatformEntity};
use crate::id::IdentityId;
use crate::marshal::{read_string, BalanceEntry, Owned};
use crate::native::{RawHandle, RawIdentityInfo, ResultDataType};
use crate::result::{expect_balances, expect_handle, expect_string};
use crate::settings::{raw_settings, PutSettings};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Decoded identity state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    /// Identity ID.
    pub id: IdentityId,
    /// Balance in credits.
    pub balance: u64,
    /// Revision.
    pub revision: u64,
    /// Number of public keys.
    pub public_keys_count: u32,
}

/// Balances after a credit transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransfer {
    /// Sender balance after the transfer.
    pub sender_balance: u64,
    /// Recipient balance after the transfer.
    pub receiver_balance: u64,
}

/// Identity operations on a session.
#[derive(Debug, Clone, Copy)]
pub struct Identities<'a> {
    sdk: &'a Sdk,
}

impl<'a> Identities<'a> {
    pub(crate) fn new(sdk: &'a Sdk) -> Self {
        Self { sdk }
    }

    /// Creates a new identity.
    pub fn create(&self) -> SdkResult<Identity> {
        let session = self.sdk.enter()?;
        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.identity_create(*session),
            ResultDataType::IdentityHandle,
            "failed to create identity",
        )?;
        Ok(Identity::from_raw(self.sdk, raw))
    }

    /// Fetches an existing identity.
    pub fn fetch(&self, id: &IdentityId) -> SdkResult<Identity> {
        let session = self.sdk.enter()?;
        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.identity_fetch(*session, id.as_bytes()),
            ResultDataType::IdentityHandle,
            "failed to fetch identity",
        )?;
        Ok(Identity::from_raw(self.sdk, raw))
    }

    /// Fetches one identity's balance.
    pub fn fetch_balance(&self, id: &IdentityId) -> SdkResult<u64> {
        let session = self.sdk.enter()?;
        let core = self.sdk.core();
        let context = "failed to fetch identity balance";
        let text = expect_string(core, core.identity_fetch_balance(*session, id.as_bytes()), context)?;
        text.trim()
            .parse()
            .map_err(|_| SdkError::serialization(context, format!("invalid balance: {text}")))
    }

    /// Fetches balances for many identities.
    ///
    /// The result is keyed by lowercase hex ID and has no entry for
    /// identities that do not exist.
    pub fn fetch_balances(&self, ids: &[IdentityId]) -> SdkResult<HashMap<String, u64>> {
        let session = self.sdk.enter()?;
        if ids.is_empty() {
            return Err(SdkError::validation("at least one identity ID is required"));
        }
        let raw_ids: Vec<[u8; 32]> = ids.iter().map(|id| id.into_bytes()).collect();

        let core = self.sdk.core();
        let entries = expect_balances(
            core,
            core.identities_fetch_balances(*session, &raw_ids),
            "failed to fetch identity balances",
        )?;

        Ok(entries
            .into_iter()
            .filter(|e| e.balance != BalanceEntry::NOT_FOUND)
            .map(|e| (IdentityId::from_bytes(e.identity_id).to_hex(), e.balance))
            .collect())
    }
}

/// An identity backed by a native handle.
///
/// Not safe for concurrent mutation; share it behind a lock if needed.
#[derive(Debug)]
pub struct Identity {
    // Must drop before `sdk`.
    handle: OwnedHandle,
    sdk: Sdk,
    info: Option<IdentityInfo>,
}

impl Identity {
    fn from_raw(sdk: &Sdk, raw: RawHandle) -> Self {
        Self {
            sdk: sdk.clone(),
            handle: OwnedHandle::new(sdk.core_arc(), EntityKind::Identity, raw),
            info: None,
        }
    }

    /// Returns identity info, reading it from the core on first use.
    pub fn get_info(&mut self) -> SdkResult<&IdentityInfo> {
        let _session = self.sdk.enter()?;
        let info = match self.info.take() {
            Some(info) => info,
            None => self.load_info()?,
        };
        let info: &IdentityInfo = self.info.insert(info);
        Ok(info)
    }

    /// Returns the identity ID.
    pub fn id(&mut self) -> SdkResult<IdentityId> {
        self.get_info().map(|info| info.id)
    }

    /// Returns the balance.
    pub fn balance(&mut self) -> SdkResult<u64> {
        self.get_info().map(|info| info.balance)
    }

    /// Forgets cached info.
    pub fn refresh(&mut self) {
        self.info = None;
    }

    /// Transfers credits to another identity.
    pub fn transfer_credits(
        &mut self,
        to: &IdentityId,
        amount: u64,
        settings: Option<&PutSettings>,
    ) -> SdkResult<CreditTransfer> {
        let session = self.sdk.enter()?;
        let raw = self.handle.require("transfer credits from")?;
        if amount == 0 {
            return Err(SdkError::validation("transfer amount must be greater than zero"));
        }
        let from = match &self.info {
            Some(info) => info.id,
            None => self.load_info()?.id,
        };
        if from == *to {
            return Err(SdkError::validation("cannot transfer credits to the same identity"));
        }

        let core = self.sdk.core();
        let settings = raw_settings(settings);
        self.info = None;
        let context = "failed to transfer credits";
        let json = expect_string(
            core,
            core.identity_transfer_credits(*session, raw, to.as_bytes(), amount, &settings),
            context,
        )?;
        serde_json::from_str(&json).map_err(|e| SdkError::serialization(context, e.to_string()))
    }

    /// Raw handle of a required argument to a call on `sdk`.
    pub(crate) fn argument_handle(&self, sdk: &Sdk, message: &str) -> SdkResult<RawHandle> {
        sdk.accept_argument(&self.sdk, EntityKind::Identity)?;
        self.handle.require_argument(message)
    }

    /// Reads info from the core without caching it. The caller holds a
    /// session token.
    fn load_info(&self) -> SdkResult<IdentityInfo> {
        let raw = self.handle.require_info()?;
        let core = self.sdk.core();
        let context = "failed to get identity info";
        let info = core.identity_get_info(raw).ok_or_else(|| {
            SdkError::native(ErrorCode::InternalError, "native core returned no info", context)
        })?;
        let info = Owned::new(core, info);
        decode_info(&info, context)
    }
}

fn decode_info(info: &RawIdentityInfo, context: &str) -> SdkResult<IdentityInfo> {
    let id = read_string(&info.id, context)?
        .ok_or_else(|| SdkError::serialization(context, "identity info has no ID"))?;
    let id = IdentityId::from_hex(&id).map_err(|e| SdkError::serialization(context, e.to_string()))?;
    Ok(IdentityInfo {
        id,
        balance: info.balance,
        revision: info.revision,
        public_keys_count: info.public_keys_count,
    })
}

impl PlatformEntity for Identity {
    fn kind(&self) -> EntityKind {
        EntityKind::Identity
    }

    fn has_handle(&self) -> bool {
        self.handle.is_live()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }

    fn release(&mut self) {
        self.info = None;
        if self.handle.release() {
            debug!("identity released");
        }
    }
}
