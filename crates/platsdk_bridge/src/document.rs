//! Documents and the property editor.
//!
//! A [`Document`] caches a decoded view of its native state. Every mutation
//! invalidates that cache, so the next read decodes native truth again.
//! Documents produced by [`Documents::search`] carry decoded data only and
//! reject every operation that needs a native handle.

use crate::context::Sdk;
use crate::contract::DataContract;
use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::handle::{EntityKind, OwnedHandle, PlatformEntity};
use crate::id::{ContractId, DocumentId, Identifier, IdentityId};
use crate::identity::Identity;
use crate::marshal::{host_string, read_string, NativeString, Owned};
use crate::native::{NativeCore, RawDocumentCreateParams, RawDocumentPublish, RawHandle, ResultDataType};
use crate::query::DocumentQuery;
use crate::result::{expect_handle, expect_none, expect_string};
use crate::settings::{raw_payment, raw_settings, PutSettings, TokenPaymentInfo};
use platsdk_value::{
    get_at_path, get_number_field, map_from_json, map_to_json, parse_path, to_json, Value, ValueMap,
};
use serde::Deserialize;
use tracing::{debug, trace};

/// Decoded document state.
///
/// System fields are optional: documents decoded from search results carry
/// only what the results contained.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    /// Document ID.
    pub id: Option<DocumentId>,
    /// Owner identity ID.
    pub owner_id: Option<IdentityId>,
    /// Contract ID.
    pub data_contract_id: Option<ContractId>,
    /// Document type name.
    pub document_type: String,
    /// Revision.
    pub revision: Option<u64>,
    /// Creation time in milliseconds since the epoch.
    pub created_at: Option<u64>,
    /// Update time in milliseconds since the epoch.
    pub updated_at: Option<u64>,
    /// Properties.
    pub data: ValueMap,
}

/// Result of an ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTransferInfo {
    /// Transition ID.
    pub transaction_id: String,
    /// Previous owner.
    pub from_identity_id: IdentityId,
    /// New owner.
    pub to_identity_id: IdentityId,
    /// Transferred document.
    pub document_id: DocumentId,
    /// Transfer time in milliseconds since the epoch.
    pub transferred_at: u64,
}

/// Arguments for [`Documents::create`].
#[derive(Debug, Clone, Copy)]
pub struct DocumentCreateParams<'a> {
    /// Contract defining the document type.
    pub data_contract: &'a DataContract,
    /// Document type name.
    pub document_type: &'a str,
    /// Owning identity.
    pub owner: &'a Identity,
    /// Initial properties.
    pub properties: &'a ValueMap,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// Document operations on a session.
#[derive(Debug, Clone, Copy)]
pub struct Documents<'a> {
    sdk: &'a Sdk,
}

impl<'a> Documents<'a> {
    pub(crate) fn new(sdk: &'a Sdk) -> Self {
        Self { sdk }
    }

    /// Creates a local document. Publish it with [`Document::put`].
    pub fn create(&self, params: DocumentCreateParams<'_>) -> SdkResult<Document> {
        let session = self.sdk.enter()?;
        let contract = params
            .data_contract
            .argument_handle(self.sdk, "data contract is required")?;
        if params.document_type.is_empty() {
            return Err(SdkError::validation("document type is required"));
        }
        let owner = params.owner.argument_handle(self.sdk, "owner identity is required")?;

        let context = "failed to create document";
        let document_type = host_string(params.document_type, "document type")?;
        let properties = map_to_json(params.properties).map_err(|e| SdkError::value(context, e))?;
        let properties = host_string(&properties, "document properties")?;

        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.document_create(
                *session,
                &RawDocumentCreateParams {
                    data_contract: contract,
                    document_type: &document_type,
                    owner_identity: owner,
                    properties_json: &properties,
                },
            ),
            ResultDataType::DocumentHandle,
            context,
        )?;
        Ok(Document::from_raw(self.sdk, raw, params.document_type))
    }

    /// Fetches a published document.
    pub fn fetch(
        &self,
        data_contract: &DataContract,
        document_type: &str,
        id: &DocumentId,
    ) -> SdkResult<Document> {
        let session = self.sdk.enter()?;
        let contract = data_contract.argument_handle(self.sdk, "data contract is required")?;
        if document_type.is_empty() {
            return Err(SdkError::validation("document type is required"));
        }
        let type_name = host_string(document_type, "document type")?;

        let core = self.sdk.core();
        let raw = expect_handle(
            core,
            core.document_fetch(*session, contract, &type_name, id.as_bytes()),
            ResultDataType::DocumentHandle,
            "failed to fetch document",
        )?;
        Ok(Document::from_raw(self.sdk, raw, document_type))
    }

    /// Runs a query. Results are documents without native handles.
    pub fn search(
        &self,
        data_contract: &DataContract,
        document_type: &str,
        query: &DocumentQuery,
    ) -> SdkResult<Vec<Document>> {
        let session = self.sdk.enter()?;
        let contract = data_contract.argument_handle(self.sdk, "data contract is required")?;
        if document_type.is_empty() {
            return Err(SdkError::validation("document type is required"));
        }
        let type_name = host_string(document_type, "document type")?;
        let query_json = host_string(&query.to_json()?, "query")?;

        let core = self.sdk.core();
        let context = "failed to search documents";
        let json = expect_string(
            core,
            core.document_search(*session, contract, &type_name, &query_json),
            context,
        )?;
        let response: SearchResponse =
            serde_json::from_str(&json).map_err(|e| SdkError::serialization(context, e.to_string()))?;
        trace!(
            results = response.documents.len(),
            total = ?response.total_count,
            "search decoded"
        );

        // Enrichment only; results are still usable without a contract ID.
        let contract_id = data_contract.peek_id().ok();
        response
            .documents
            .into_iter()
            .map(|doc| match doc {
                Value::Map(data) => Ok(Document::from_search(
                    self.sdk,
                    document_type,
                    contract_id,
                    data,
                )),
                other => Err(SdkError::serialization(
                    context,
                    format!("expected document object, found {}", other.type_name()),
                )),
            })
            .collect()
    }
}

/// Shared arguments of a publish-family call.
struct Publish<'a> {
    operation: &'static str,
    context: &'static str,
    signer: &'a Identity,
    signer_required: &'static str,
    data_contract: Option<&'a DataContract>,
    settings: Option<&'a PutSettings>,
    payment: Option<&'a TokenPaymentInfo>,
    wait: bool,
}

impl<'a> Publish<'a> {
    fn new(operation: &'static str, context: &'static str, signer: &'a Identity, wait: bool) -> Self {
        Self {
            operation,
            context,
            signer,
            signer_required: "signing identity is required",
            data_contract: None,
            settings: None,
            payment: None,
            wait,
        }
    }

    fn contract(mut self, data_contract: &'a DataContract) -> Self {
        self.data_contract = Some(data_contract);
        self
    }

    fn settings(mut self, settings: Option<&'a PutSettings>) -> Self {
        self.settings = settings;
        self
    }

    fn payment(mut self, payment: Option<&'a TokenPaymentInfo>) -> Self {
        self.payment = payment;
        self
    }

    fn purchaser(mut self) -> Self {
        self.signer_required = "purchaser identity is required";
        self
    }
}

/// A document.
///
/// Not safe for concurrent mutation; share it behind a lock if needed.
#[derive(Debug)]
pub struct Document {
    // Must drop before `sdk`.
    handle: OwnedHandle,
    sdk: Sdk,
    document_type: String,
    info: Option<DocumentInfo>,
}

impl Document {
    fn from_raw(sdk: &Sdk, raw: RawHandle, document_type: &str) -> Self {
        Self {
            sdk: sdk.clone(),
            handle: OwnedHandle::new(sdk.core_arc(), EntityKind::Document, raw),
            document_type: document_type.to_string(),
            info: None,
        }
    }

    fn from_search(sdk: &Sdk, document_type: &str, contract_id: Option<ContractId>, data: ValueMap) -> Self {
        let id_field = |name: &str| {
            data.get(name)
                .and_then(Value::as_text)
                .and_then(|s| Identifier::from_hex(s).ok())
        };
        let number_field = |name: &str| {
            get_number_field(&data, name)
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        };
        let id = id_field("$id");
        let owner_id = id_field("$ownerId");
        let revision = number_field("$revision");
        let created_at = number_field("$createdAt");
        let updated_at = number_field("$updatedAt");

        Self {
            sdk: sdk.clone(),
            handle: OwnedHandle::detached(sdk.core_arc(), EntityKind::Document),
            document_type: document_type.to_string(),
            info: Some(DocumentInfo {
                id,
                owner_id,
                data_contract_id: contract_id,
                document_type: document_type.to_string(),
                revision,
                created_at,
                updated_at,
                data,
            }),
        }
    }

    /// Document type name.
    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    /// Returns true if the document came from search results.
    pub fn is_search_result(&self) -> bool {
        self.handle.is_detached()
    }

    /// Returns document info, reading it from the core when not cached.
    pub fn get_info(&mut self) -> SdkResult<&DocumentInfo> {
        let _session = self.sdk.enter()?;
        let info = match self.info.take() {
            Some(info) => info,
            None => self.load_info()?,
        };
        let info: &DocumentInfo = self.info.insert(info);
        Ok(info)
    }

    /// Returns the document ID.
    pub fn id(&mut self) -> SdkResult<Option<DocumentId>> {
        self.get_info().map(|info| info.id)
    }

    /// Returns all properties.
    pub fn data(&mut self) -> SdkResult<&ValueMap> {
        self.get_info().map(|info| &info.data)
    }

    /// Returns a top-level property.
    pub fn get(&mut self, field: &str) -> SdkResult<Option<Value>> {
        self.get_info().map(|info| info.data.get(field).cloned())
    }

    /// Returns a property by dotted path.
    pub fn get_property(&mut self, path: &str) -> SdkResult<Option<Value>> {
        parse_path(path).map_err(invalid_path)?;
        self.get_info()
            .map(|info| get_at_path(&info.data, path).cloned())
    }

    /// Returns a numeric property as `f64`, whatever its representation.
    pub fn get_number(&mut self, path: &str) -> SdkResult<Option<f64>> {
        Ok(self.get_property(path)?.and_then(|v| v.as_number()))
    }

    /// Sets a top-level property and pushes all properties to the core.
    ///
    /// The cache is invalidated; read the value back with [`Document::get`].
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> SdkResult<()> {
        let _session = self.sdk.enter()?;
        let raw = self.handle.require("set property on")?;
        if field.is_empty() {
            return Err(SdkError::validation("field name is required"));
        }

        let mut data = match self.info.take() {
            Some(info) => info.data,
            None => self.load_info()?.data,
        };
        data.insert(field.to_string(), value.into());

        let context = "failed to set document properties";
        let json = map_to_json(&data).map_err(|e| SdkError::value(context, e))?;
        let json = host_string(&json, "document properties")?;
        let core = self.sdk.core();
        expect_none(core, core.document_set_properties(raw, &json), context)
    }

    /// Sets a property by dotted path, creating intermediate objects.
    pub fn set_property(&mut self, path: &str, value: impl Into<Value>) -> SdkResult<()> {
        let _session = self.sdk.enter()?;
        let raw = self.handle.require("set property on")?;
        parse_path(path).map_err(invalid_path)?;

        let context = "failed to set document property";
        let value = to_json(&value.into()).map_err(|e| SdkError::value(context, e))?;
        let path = host_string(path, "property path")?;
        let value = host_string(&value, "property value")?;

        self.info = None;
        let core = self.sdk.core();
        expect_none(core, core.document_set_property(raw, &path, &value), context)
    }

    /// Removes a property by dotted path. Missing paths are not an error.
    pub fn remove_property(&mut self, path: &str) -> SdkResult<()> {
        let _session = self.sdk.enter()?;
        let raw = self.handle.require("remove property from")?;
        parse_path(path).map_err(invalid_path)?;
        let path = host_string(path, "property path")?;

        self.info = None;
        let core = self.sdk.core();
        expect_none(
            core,
            core.document_remove_property(raw, &path),
            "failed to remove document property",
        )
    }

    /// Forgets cached info.
    pub fn refresh(&mut self) {
        if self.handle.is_live() {
            self.info = None;
        }
    }

    /// Runs a publish-family call after the shared checks.
    fn publish<T>(
        &mut self,
        request: Publish<'_>,
        call: impl FnOnce(&dyn NativeCore, RawHandle, &RawDocumentPublish<'_>) -> SdkResult<T>,
    ) -> SdkResult<T> {
        let session = self.sdk.enter()?;
        let document = self.handle.require(request.operation)?;
        let signer = request.signer.argument_handle(&self.sdk, request.signer_required)?;
        let data_contract = request
            .data_contract
            .map(|c| c.argument_handle(&self.sdk, "data contract is required"))
            .transpose()?;
        let settings = raw_settings(request.settings);
        let payment = raw_payment(request.payment)?;

        self.info = None;
        let publish = RawDocumentPublish {
            document,
            data_contract,
            signer,
            settings: &settings,
            token_payment: payment.as_ref(),
            wait: request.wait,
        };
        let result = call(self.sdk.core(), *session, &publish);
        if result.is_ok() {
            debug!(operation = request.operation, wait = request.wait, "document {}", request.context);
        }
        result
    }

    fn put_inner(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
        wait: bool,
    ) -> SdkResult<()> {
        let request = Publish::new("put", "published", signer, wait)
            .contract(data_contract)
            .settings(settings)
            .payment(payment);
        self.publish(request, |core, session, publish| {
            expect_none(core, core.document_put_to_platform(session, publish), "failed to put document")
        })
    }

    /// Publishes the document.
    pub fn put(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<()> {
        self.put_inner(data_contract, signer, settings, payment, false)
    }

    /// Publishes the document and waits for confirmation.
    pub fn put_and_wait(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<()> {
        self.put_inner(data_contract, signer, settings, payment, true)
    }

    fn replace_inner(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
        wait: bool,
    ) -> SdkResult<()> {
        let request = Publish::new("replace", "replaced", signer, wait)
            .contract(data_contract)
            .settings(settings)
            .payment(payment);
        self.publish(request, |core, session, publish| {
            expect_none(
                core,
                core.document_replace_on_platform(session, publish),
                "failed to replace document",
            )
        })
    }

    /// Replaces the published document with local changes.
    pub fn replace(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<()> {
        self.replace_inner(data_contract, signer, settings, payment, false)
    }

    /// Replaces the published document and waits for confirmation.
    pub fn replace_and_wait(
        &mut self,
        data_contract: &DataContract,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<()> {
        self.replace_inner(data_contract, signer, settings, payment, true)
    }

    fn delete_inner(&mut self, signer: &Identity, settings: Option<&PutSettings>, wait: bool) -> SdkResult<()> {
        let request = Publish::new("delete", "deleted", signer, wait).settings(settings);
        self.publish(request, |core, session, publish| {
            expect_none(core, core.document_delete(session, publish), "failed to delete document")
        })
    }

    /// Deletes the published document.
    pub fn delete(&mut self, signer: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.delete_inner(signer, settings, false)
    }

    /// Deletes the published document and waits for confirmation.
    pub fn delete_and_wait(&mut self, signer: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.delete_inner(signer, settings, true)
    }

    fn transfer_inner(
        &mut self,
        recipient: &IdentityId,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
        wait: bool,
    ) -> SdkResult<DocumentTransferInfo> {
        let request = Publish::new("transfer", "transferred", signer, wait)
            .settings(settings)
            .payment(payment);
        self.publish(request, |core, session, publish| {
            let context = "failed to transfer document";
            let json = expect_string(
                core,
                core.document_transfer_to_identity(session, publish, recipient.as_bytes()),
                context,
            )?;
            serde_json::from_str(&json).map_err(|e| SdkError::serialization(context, e.to_string()))
        })
    }

    /// Transfers ownership to `recipient`.
    pub fn transfer(
        &mut self,
        recipient: &IdentityId,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<DocumentTransferInfo> {
        self.transfer_inner(recipient, signer, settings, payment, false)
    }

    /// Transfers ownership and waits for confirmation.
    pub fn transfer_and_wait(
        &mut self,
        recipient: &IdentityId,
        signer: &Identity,
        settings: Option<&PutSettings>,
        payment: Option<&TokenPaymentInfo>,
    ) -> SdkResult<DocumentTransferInfo> {
        self.transfer_inner(recipient, signer, settings, payment, true)
    }

    fn purchase_inner(&mut self, purchaser: &Identity, settings: Option<&PutSettings>, wait: bool) -> SdkResult<()> {
        let request = Publish::new("purchase", "purchased", purchaser, wait)
            .purchaser()
            .settings(settings);
        self.publish(request, |core, session, publish| {
            expect_none(core, core.document_purchase(session, publish), "failed to purchase document")
        })
    }

    /// Buys the document at its listed price.
    pub fn purchase(&mut self, purchaser: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.purchase_inner(purchaser, settings, false)
    }

    /// Buys the document and waits for confirmation.
    pub fn purchase_and_wait(&mut self, purchaser: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.purchase_inner(purchaser, settings, true)
    }

    fn update_price_inner(
        &mut self,
        price: u64,
        signer: &Identity,
        settings: Option<&PutSettings>,
        wait: bool,
    ) -> SdkResult<()> {
        let request = Publish::new("update price of", "repriced", signer, wait).settings(settings);
        self.publish(request, |core, session, publish| {
            expect_none(
                core,
                core.document_update_price(session, publish, price),
                "failed to update document price",
            )
        })
    }

    /// Lists the document for sale at `price` credits.
    pub fn update_price(&mut self, price: u64, signer: &Identity, settings: Option<&PutSettings>) -> SdkResult<()> {
        self.update_price_inner(price, signer, settings, false)
    }

    /// Lists the document for sale and waits for confirmation.
    pub fn update_price_and_wait(
        &mut self,
        price: u64,
        signer: &Identity,
        settings: Option<&PutSettings>,
    ) -> SdkResult<()> {
        self.update_price_inner(price, signer, settings, true)
    }

    /// Removes the document from the platform.
    ///
    /// The local handle stays live until [`PlatformEntity::release`].
    pub fn destroy(&mut self, settings: Option<&PutSettings>) -> SdkResult<()> {
        let session = self.sdk.enter()?;
        let raw = self.handle.require("destroy")?;
        let settings = raw_settings(settings);

        self.info = None;
        let core = self.sdk.core();
        expect_none(
            core,
            core.document_destroy(*session, raw, &settings),
            "failed to destroy document",
        )?;
        debug!("document destroyed");
        Ok(())
    }

    /// Reads info from the core without caching it. The caller holds a
    /// session token.
    fn load_info(&self) -> SdkResult<DocumentInfo> {
        let raw = self.handle.require_info()?;
        let core = self.sdk.core();
        let context = "failed to get document info";
        let info = core.document_get_info(raw).ok_or_else(|| {
            SdkError::native(ErrorCode::InternalError, "native core returned no info", context)
        })?;
        let info = Owned::new(core, info);

        let id = |s: &NativeString| -> SdkResult<Option<Identifier>> {
            read_string(s, context)?
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Identifier::from_hex(&s)
                        .map_err(|e| SdkError::serialization(context, e.to_string()))
                })
                .transpose()
        };
        let timestamp = |t: i64| u64::try_from(t).ok().filter(|t| *t > 0);

        let document_type = read_string(&info.document_type, context)?
            .unwrap_or_else(|| self.document_type.clone());
        let data = read_string(&info.data_json, context)?.unwrap_or_default();
        let data = map_from_json(&data).map_err(|e| SdkError::value(context, e))?;

        Ok(DocumentInfo {
            id: id(&info.id)?,
            owner_id: id(&info.owner_id)?,
            data_contract_id: id(&info.data_contract_id)?,
            document_type,
            revision: Some(info.revision),
            created_at: timestamp(info.created_at),
            updated_at: timestamp(info.updated_at),
            data,
        })
    }
}

impl PlatformEntity for Document {
    fn kind(&self) -> EntityKind {
        EntityKind::Document
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
            debug!(document_type = %self.document_type, "document released");
        }
    }
}

fn invalid_path(source: platsdk_value::ValueError) -> SdkError {
    SdkError::validation(source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SdkConfig;
    use crate::error::ErrorKind;
    use crate::mock::MockCore;
    use crate::query::QueryBuilder;
    use std::sync::Arc;

    struct Fixture {
        mock: Arc<MockCore>,
        sdk: Sdk,
        owner: Identity,
        contract: DataContract,
    }

    fn fixture() -> Fixture {
        let mock = Arc::new(MockCore::new());
        let sdk = Sdk::open(mock.clone(), SdkConfig::default()).unwrap();
        let owner = sdk.identities().create().unwrap();
        let schemas = map_from_json(
            r#"{"note":{"type":"object","properties":{"message":{"type":"string"},"score":{"type":"number"}},"required":["message"]}}"#,
        )
        .unwrap();
        let mut contract = sdk.contracts().create(&owner, &schemas).unwrap();
        contract.put_and_wait(&owner, None).unwrap();
        Fixture {
            mock,
            sdk,
            owner,
            contract,
        }
    }

    fn note(f: &Fixture, message: &str, score: i64) -> Document {
        let properties = map_from_json(&format!(
            r#"{{"message":"{message}","score":{score},"meta":{{"lang":"en","tags":["a"]}}}}"#
        ))
        .unwrap();
        f.sdk
            .documents()
            .create(DocumentCreateParams {
                data_contract: &f.contract,
                document_type: "note",
                owner: &f.owner,
                properties: &properties,
            })
            .unwrap()
    }

    #[test]
    fn create_reads_info() {
        let f = fixture();
        let mut doc = note(&f, "hello", 1);
        let mut owner = f.sdk.identities().fetch(&f.mock.identity_ids()[0]).unwrap();

        let info = doc.get_info().unwrap().clone();
        assert!(info.id.is_some());
        assert_eq!(info.owner_id, Some(owner.id().unwrap()));
        assert_eq!(info.document_type, "note");
        assert_eq!(info.revision, Some(1));
        assert!(info.created_at.is_some());
        assert_eq!(doc.get("message").unwrap(), Some(Value::from("hello")));
        assert_eq!(doc.get_number("score").unwrap(), Some(1.0));
    }

    #[test]
    fn set_resyncs_whole_map() {
        let f = fixture();
        let mut doc = note(&f, "v1", 1);
        doc.set("message", "v2").unwrap();
        assert_eq!(doc.get("message").unwrap(), Some(Value::from("v2")));
        assert_eq!(doc.get_property("meta.lang").unwrap(), Some(Value::from("en")));
    }

    #[test]
    fn set_property_keeps_siblings() {
        let f = fixture();
        let mut doc = note(&f, "hi", 1);
        doc.set_property("meta.lang", "nb").unwrap();
        doc.set_property("meta.extra.depth", 2).unwrap();

        assert_eq!(doc.get_property("meta.lang").unwrap(), Some(Value::from("nb")));
        assert_eq!(doc.get_number("meta.extra.depth").unwrap(), Some(2.0));
        assert_eq!(
            doc.get_property("meta.tags").unwrap(),
            Some(Value::from(vec!["a"]))
        );
    }

    #[test]
    fn remove_property_keeps_others() {
        let f = fixture();
        let mut doc = note(&f, "hi", 1);
        doc.remove_property("meta.lang").unwrap();
        doc.remove_property("meta.missing").unwrap();

        assert_eq!(doc.get_property("meta.lang").unwrap(), None);
        assert!(doc.get_property("meta.tags").unwrap().is_some());
        assert_eq!(doc.get("message").unwrap(), Some(Value::from("hi")));
    }

    #[test]
    fn bad_paths_fail_locally() {
        let f = fixture();
        let mut doc = note(&f, "hi", 1);
        let calls = f.mock.stats().boundary_calls;
        for path in ["", "a..b", ".a"] {
            let err = doc.set_property(path, 1).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationFailed);
            assert_eq!(doc.remove_property(path).unwrap_err().kind(), ErrorKind::ValidationFailed);
        }
        assert_eq!(f.mock.stats().boundary_calls, calls);
    }

    #[test]
    fn set_property_through_scalar_is_native_error() {
        let f = fixture();
        let mut doc = note(&f, "hi", 1);
        let err = doc.set_property("message.deeper", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(doc.get("message").unwrap(), Some(Value::from("hi")));
    }

    #[test]
    fn publish_lifecycle() {
        let f = fixture();
        let mut doc = note(&f, "hi", 1);
        doc.put_and_wait(&f.contract, &f.owner, None, None).unwrap();
        let id = doc.id().unwrap().unwrap();

        let mut fetched = f.sdk.documents().fetch(&f.contract, "note", &id).unwrap();
        assert_eq!(fetched.get("message").unwrap(), Some(Value::from("hi")));

        doc.set("message", "edited").unwrap();
        doc.replace(&f.contract, &f.owner, None, None).unwrap();
        assert_eq!(doc.get_info().unwrap().revision, Some(2));

        doc.delete_and_wait(&f.owner, None).unwrap();
        let err = f.sdk.documents().fetch(&f.contract, "note", &id).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(f.mock.outstanding_allocations(), 0);
    }

    #[test]
    fn transfer_and_purchase() {
        let f = fixture();
        let mut buyer = f.sdk.identities().create().unwrap();
        let buyer_id = buyer.id().unwrap();
        let mut doc = note(&f, "for sale", 1);
        doc.put(&f.contract, &f.owner, None, None).unwrap();

        doc.update_price(100, &f.owner, None).unwrap();
        doc.purchase_and_wait(&buyer, None).unwrap();
        assert_eq!(doc.get_info().unwrap().owner_id, Some(buyer_id));
        buyer.refresh();
        assert_eq!(buyer.balance().unwrap(), MockCore::DEFAULT_IDENTITY_BALANCE - 100);

        let original_owner = f.mock.identity_ids()[0];
        let transfer = doc.transfer(&original_owner, &buyer, None, None).unwrap();
        assert_eq!(transfer.from_identity_id, buyer_id);
        assert_eq!(transfer.to_identity_id, original_owner);
        assert_eq!(Some(transfer.document_id), doc.id().unwrap());
    }

    #[test]
    fn destroy_removes_from_platform() {
        let f = fixture();
        let mut doc = note(&f, "bye", 1);
        doc.put(&f.contract, &f.owner, None, None).unwrap();
        let id = doc.id().unwrap().unwrap();
        doc.destroy(None).unwrap();
        assert!(doc.has_handle());
        assert!(f.sdk.documents().fetch(&f.contract, "note", &id).is_err());
    }

    #[test]
    fn search_results_are_handle_less() {
        let f = fixture();
        for (message, score) in [("a", 1), ("b", 5), ("c", 9)] {
            note(&f, message, score)
                .put(&f.contract, &f.owner, None, None)
                .unwrap();
        }

        let query = QueryBuilder::new()
            .where_gt("score", 2)
            .order_by("score", false)
            .build();
        let mut results = f.sdk.documents().search(&f.contract, "note", &query).unwrap();
        assert_eq!(results.len(), 2);

        let first = &mut results[0];
        assert!(first.is_search_result());
        assert_eq!(first.get("message").unwrap(), Some(Value::from("c")));
        let info = first.get_info().unwrap();
        assert!(info.id.is_some());
        assert_eq!(info.revision, Some(1));
        assert!(info.data_contract_id.is_some());

        let calls = f.mock.stats().boundary_calls;
        let err = first.set_property("message", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleMissing);
        assert_eq!(
            err.to_string(),
            "cannot set property on document without handle - document was created from search results"
        );
        let err = first.put(&f.contract, &f.owner, None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot put document without handle - document was created from search results"
        );
        assert!(first.remove_property("message").is_err());
        assert!(first.delete(&f.owner, None).is_err());
        assert_eq!(f.mock.stats().boundary_calls, calls);

        first.refresh();
        assert!(first.get_info().is_ok());
    }

    #[test]
    fn search_result_without_cached_info_has_no_handle() {
        let f = fixture();
        let mut doc = Document::from_search(&f.sdk, "note", None, ValueMap::new());
        doc.info = None;
        let calls = f.mock.stats().boundary_calls;

        let err = doc.get_info().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandleMissing);
        assert_eq!(
            err.to_string(),
            "document has no handle - created from search results"
        );
        assert!(doc.data().is_err());
        assert_eq!(f.mock.stats().boundary_calls, calls);
    }

    #[test]
    fn validation_messages() {
        let f = fixture();
        let mut released_owner = f.sdk.identities().create().unwrap();
        released_owner.release();
        let err = f
            .sdk
            .documents()
            .create(DocumentCreateParams {
                data_contract: &f.contract,
                document_type: "",
                owner: &f.owner,
                properties: &ValueMap::new(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "document type is required");

        let mut doc = note(&f, "x", 1);
        let err = doc
            .put(&f.contract, &released_owner, None, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "signing identity is required");
        let err = doc.purchase(&released_owner, None).unwrap_err();
        assert_eq!(err.to_string(), "purchaser identity is required");
    }

    #[test]
    fn missing_required_field_is_rejected_by_core() {
        let f = fixture();
        let err = f
            .sdk
            .documents()
            .create(DocumentCreateParams {
                data_contract: &f.contract,
                document_type: "note",
                owner: &f.owner,
                properties: &ValueMap::new(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }
}
