//! Data contracts.

use crate::context::Sdk;
use crate::error::{SdkError, SdkResult};
use crate::handle::{EntityKind, OwnedHandle, PlatformEntity};
use crate::id::{ContractId, IdentityId};
use crate::identity::Identity;
use crate::marshal::host_string;
use crate::native::{RawHandle, ResultDataType};
use crate::result::{expect_bytes, expect_handle, expect_none, expect_string};
use crate::settings::{raw_settings, PutSettings};
use platsdk_value::{from_json, map_to_json, Value, ValueMap};
use serde::Deserialize;
use tracing::debug;

/// Decoded contract state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    /// Contract ID.
    pub id: ContractId,
    /// Owner identity ID.
    pub owner_id: IdentityId,
    /// Contract version.
    pub version: u32,
    /// Document type names.
    #[serde(default)]
    pub document_types: Vec<String>,
}

/// Data contract operations on a session.
#[derive(Debug, Clone, Copy)]
pub struct Contracts<'a> {
    sdk: &'a Sdk,
}

impl<'a> Contracts<'a> {
    pub(crate) fn new(sdk: &'a Sdk) -> Self {
        Self { sdk }
    }

    /// Creates a local contract owned by `owner`.
    ///
    /// `document_schemas` maps each document type name to its JSON schema.
    pub fn create(&self, owner: &Identity, document_schemas: &ValueMap) -> SdkResult<DataContract> {
        let session = self.sdk.enter()?;
        let owner = owner.argument_handle(self.sdk, "owner identity is required")?;
        if document_schemas.is_empty() {
            return Err(SdkError::validation("at least one document type is required"));
        }
        for (name, schema) in document_schemas {
            if name.is_empty() {
                return Err(SdkError::validation("document type name must not be empty"));
            }
            if schema.as_map().is_none() {
                return Err(SdkError::validation(format!(
                    "schema for document type '{name}' must be an object"
                )));
            }
        }
        let context = "failed to create data contract";
        let json = map_to_json(document_schemas).map_err(|e| SdkError::value(context, e))?;
        let json = host_string(&json, "document schemas")?;

        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.data_contract_create(*session, owner, &json),
            ResultDataType::DataContractHandle,
            context,
        )?;
        Ok(DataContract::from_raw(self.sdk, raw))
    }

    /// Fetches a published contract.
    pub fn fetch(&self, id: &ContractId) -> SdkResult<DataContract> {
        let session = self.sdk.enter()?;
        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.data_contract_fetch(*session, id.as_bytes()),
            ResultDataType::DataContractHandle,
            "failed to fetch data contract",
        )?;
        Ok(DataContract::from_raw(self.sdk, raw))
    }
}

/// A data contract backed by a native handle.
#[derive(Debug)]
pub struct DataContract {
    // Must drop before `sdk`.
    handle: OwnedHandle,
    sdk: Sdk,
    info: Option<ContractInfo>,
}

impl DataContract {
    fn from_raw(sdk: &Sdk, raw: RawHandle) -> Self {
        Self {
            sdk: sdk.clone(),
            handle: OwnedHandle::new(sdk.core_arc(), EntityKind::DataContract, raw),
            info: None,
        }
    }

    /// Returns contract info, reading it from the core on first use.
    pub fn get_info(&mut self) -> SdkResult<&ContractInfo> {
        let _session = self.sdk.enter()?;
        let info = match self.info.take() {
            Some(info) => info,
            None => self.load_info()?,
        };
        let info: &ContractInfo = self.info.insert(info);
        Ok(info)
    }

    /// Returns the contract ID.
    pub fn id(&mut self) -> SdkResult<ContractId> {
        self.get_info().map(|info| info.id)
    }

    /// Returns true if the contract defines `document_type`.
    pub fn has_document_type(&mut self, document_type: &str) -> SdkResult<bool> {
        self.get_info()
            .map(|info| info.document_types.iter().any(|t| t == document_type))
    }

    /// Returns the JSON schema of one document type.
    pub fn schema(&self, document_type: &str) -> SdkResult<Value> {
        let _session = self.sdk.enter()?;
        let raw = self.handle.require("get schema of")?;
        if document_type.is_empty() {
            return Err(SdkError::validation("document type is required"));
        }
        let document_type = host_string(document_type, "document type")?;

        let core = self.sdk.core();
        let context = "failed to get document schema";
        let json = expect_string(core, core.data_contract_get_schema(raw, &document_type), context)?;
        from_json(&json).map_err(|e| SdkError::value(context, e))
    }

    /// Serializes the contract as produced by the core.
    pub fn to_bytes(&self) -> SdkResult<Vec<u8>> {
        let _session = self.sdk.enter()?;
        let raw = self.handle.require("serialize")?;
        let core = self.sdk.core();
        expect_bytes(core, core.data_contract_serialize(raw), "failed to serialize data contract")
    }

    /// Publishes the contract without waiting for confirmation.
    pub fn put(&mut self, signer: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.publish(signer, settings, false)
    }

    /// Publishes the contract and waits for confirmation.
    pub fn put_and_wait(&mut self, signer: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.publish(signer, settings, true)
    }

    fn publish(&mut self, signer: &Identity, settings: Option<&PutSettings>, wait: bool) -> SdkResult<()> {
        let session = self.sdk.enter()?;
        let raw = self.handle.require("put")?;
        let signer = signer.argument_handle(&self.sdk, "signing identity is required")?;
        let settings = raw_settings(settings);

        self.info = None;
        let core = self.sdk.core();
        expect_none(
            core,
            core.data_contract_put_to_platform(*session, raw, signer, &settings, wait),
            "failed to put data contract",
        )?;
        debug!(wait, "data contract published");
        Ok(())
    }

    /// Raw handle of a required argument to a call on `sdk`.
    pub(crate) fn argument_handle(&self, sdk: &Sdk, message: &str) -> SdkResult<RawHandle> {
        sdk.accept_argument(&self.sdk, EntityKind::DataContract)?;
        self.handle.require_argument(message)
    }

    /// Contract ID from the cache, or read from the core without caching.
    /// The caller holds a session token.
    pub(crate) fn peek_id(&self) -> SdkResult<ContractId> {
        match &self.info {
            Some(info) => Ok(info.id),
            None => self.load_info().map(|info| info.id),
        }
    }

    fn load_info(&self) -> SdkResult<ContractInfo> {
        let raw = self.handle.require_info()?;
        let core = self.sdk.core();
        let context = "failed to get data contract info";
        let json = expect_string(core, core.data_contract_get_info(raw), context)?;
        serde_json::from_str(&json).map_err(|e| SdkError::serialization(context, e.to_string()))
    }
}

impl PlatformEntity for DataContract {
    fn kind(&self) -> EntityKind {
        EntityKind::DataContract
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
            debug!("data contract released");
        }
    }
}
