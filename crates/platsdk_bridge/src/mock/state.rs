//! Platform state held by the mock core.

use super::query;
use crate::error::ErrorCode;
use crate::id::Identifier;
use crate::marshal::BalanceEntry;
use crate::native::{RawDocumentCreateParams, RawDocumentPublish, RawHandle, RawTokenPaymentInfo};
use platsdk_value::{
    from_json, map_from_json, map_to_json, remove_at_path, set_at_path, to_json, Value, ValueMap,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ffi::CStr;

/// Clock origin, milliseconds since the epoch.
const GENESIS_MS: u64 = 1_700_000_000_000;
const HANDLE_BASE: usize = 0x1000;
const HANDLE_STRIDE: usize = 0x10;

/// An in-band failure, turned into a `NativeError` at the boundary.
#[derive(Debug, Clone)]
pub(super) struct Failure {
    pub code: ErrorCode,
    pub message: String,
}

impl Failure {
    pub(super) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(super) fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, message)
    }

    pub(super) fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    fn crypto(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, message)
    }
}

pub(super) type Outcome<T> = Result<T, Failure>;

/// Successful result of a call, before native allocation.
#[derive(Debug)]
pub(super) enum Payload {
    None,
    Text(String),
    Bytes(Vec<u8>),
    Session(RawHandle),
    Identity(RawHandle),
    Contract(RawHandle),
    Document(RawHandle),
    Balances(Vec<BalanceEntry>),
}

/// Handle kind a destroy call expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HandleKind {
    Session,
    Identity,
    Contract,
    Document,
}

/// Outcome of a destroy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Released {
    Freed,
    Missing,
    WrongKind,
}

#[derive(Debug, Clone)]
struct IdentityRecord {
    balance: u64,
    revision: u64,
    public_keys: u32,
}

#[derive(Debug, Clone)]
struct ContractRecord {
    id: [u8; 32],
    owner: [u8; 32],
    version: u32,
    schemas: ValueMap,
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    id: [u8; 32],
    owner: [u8; 32],
    contract_id: [u8; 32],
    document_type: String,
    revision: u64,
    created_at: u64,
    updated_at: u64,
    price: Option<u64>,
    data: ValueMap,
}

impl DocumentRecord {
    /// Properties plus `$`-prefixed system fields.
    fn to_search_result(&self) -> ValueMap {
        let mut doc = self.data.clone();
        doc.insert("$id".into(), Value::from(hex(&self.id)));
        doc.insert("$ownerId".into(), Value::from(hex(&self.owner)));
        doc.insert("$revision".into(), Value::from(self.revision));
        doc.insert("$createdAt".into(), Value::from(self.created_at));
        doc.insert("$updatedAt".into(), Value::from(self.updated_at));
        doc
    }
}

#[derive(Debug)]
enum Object {
    Session,
    Identity([u8; 32]),
    Contract(ContractRecord),
    Document(DocumentRecord),
    Opaque,
}

impl Object {
    fn is(&self, kind: HandleKind) -> bool {
        matches!(
            (self, kind),
            (Object::Session, HandleKind::Session)
                | (Object::Identity(_), HandleKind::Identity)
                | (Object::Contract(_), HandleKind::Contract)
                | (Object::Document(_), HandleKind::Document)
                | (
                    Object::Opaque,
                    HandleKind::Identity | HandleKind::Contract | HandleKind::Document
                )
        )
    }
}

/// Identity info, decoded for marshaling.
pub(super) struct IdentitySummary {
    pub id: String,
    pub balance: u64,
    pub revision: u64,
    pub public_keys: u32,
}

/// Document info, decoded for marshaling.
pub(super) struct DocumentSummary {
    pub id: String,
    pub owner_id: String,
    pub data_contract_id: String,
    pub document_type: String,
    pub revision: u64,
    pub created_at: i64,
    pub updated_at: i64,
    pub data_json: String,
}

fn hex(id: &[u8; 32]) -> String {
    Identifier::from_bytes(*id).to_hex()
}

fn text<'c>(s: &'c CStr, what: &str) -> Outcome<&'c str> {
    s.to_str()
        .map_err(|_| Failure::invalid(format!("{what} is not valid UTF-8")))
}

fn parse_map(s: &CStr, what: &str) -> Outcome<ValueMap> {
    map_from_json(text(s, what)?).map_err(|e| Failure::serialization(format!("{what}: {e}")))
}

fn millis(t: u64) -> i64 {
    i64::try_from(t).unwrap_or(i64::MAX)
}

fn check_required(document_type: &str, schema: &Value, data: &ValueMap) -> Outcome<()> {
    let required = schema.get("required").and_then(Value::as_array).unwrap_or(&[]);
    for field in required.iter().filter_map(Value::as_text) {
        if !data.contains_key(field) {
            return Err(Failure::invalid(format!(
                "document type '{document_type}' requires field '{field}'"
            )));
        }
    }
    Ok(())
}

fn check_payment(payment: Option<&RawTokenPaymentInfo>) -> Outcome<()> {
    match payment {
        Some(p) if p.maximum_token_cost != 0 && p.minimum_token_cost > p.maximum_token_cost => Err(
            Failure::invalid("minimum token cost exceeds maximum token cost"),
        ),
        _ => Ok(()),
    }
}

/// The simulated platform plus the handle table.
#[derive(Debug)]
pub(super) struct MockState {
    next_handle: usize,
    objects: HashMap<usize, Object>,
    identities: HashMap<[u8; 32], IdentityRecord>,
    identity_order: Vec<[u8; 32]>,
    contracts: HashMap<[u8; 32], ContractRecord>,
    documents: HashMap<[u8; 32], DocumentRecord>,
    clock: u64,
    nonce: u64,
    default_balance: u64,
    default_public_keys: u32,
}

impl MockState {
    pub(super) fn new(default_balance: u64, default_public_keys: u32) -> Self {
        Self {
            next_handle: HANDLE_BASE,
            objects: HashMap::new(),
            identities: HashMap::new(),
            identity_order: Vec::new(),
            contracts: HashMap::new(),
            documents: HashMap::new(),
            clock: 0,
            nonce: 0,
            default_balance,
            default_public_keys,
        }
    }

    // Addresses are never reused, so a stale handle cannot alias a new one.
    fn allocate(&mut self, object: Object) -> Outcome<RawHandle> {
        let addr = self.next_handle;
        self.next_handle += HANDLE_STRIDE;
        let handle = RawHandle::from_addr(addr)
            .ok_or_else(|| Failure::new(ErrorCode::InternalError, "handle space exhausted"))?;
        self.objects.insert(addr, object);
        Ok(handle)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        GENESIS_MS + self.clock * 1000
    }

    fn derive_id(&mut self, parts: &[&[u8]]) -> [u8; 32] {
        self.nonce += 1;
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.update(self.nonce.to_le_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hasher.finalize());
        id
    }

    fn session(&self, sdk: RawHandle) -> Outcome<()> {
        match self.objects.get(&sdk.addr()) {
            Some(Object::Session) => Ok(()),
            _ => Err(Failure::state("SDK session is not open")),
        }
    }

    fn identity_id(&self, handle: RawHandle) -> Outcome<[u8; 32]> {
        match self.objects.get(&handle.addr()) {
            Some(Object::Identity(id)) => Ok(*id),
            _ => Err(Failure::invalid("not a live identity handle")),
        }
    }

    fn contract(&self, handle: RawHandle) -> Outcome<&ContractRecord> {
        match self.objects.get(&handle.addr()) {
            Some(Object::Contract(record)) => Ok(record),
            _ => Err(Failure::invalid("not a live data contract handle")),
        }
    }

    fn document(&self, handle: RawHandle) -> Outcome<&DocumentRecord> {
        match self.objects.get(&handle.addr()) {
            Some(Object::Document(record)) => Ok(record),
            _ => Err(Failure::invalid("not a live document handle")),
        }
    }

    fn document_mut(&mut self, handle: RawHandle) -> Outcome<&mut DocumentRecord> {
        match self.objects.get_mut(&handle.addr()) {
            Some(Object::Document(record)) => Ok(record),
            _ => Err(Failure::invalid("not a live document handle")),
        }
    }

    fn published(&self, id: &[u8; 32]) -> Outcome<DocumentRecord> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| Failure::not_found(format!("document {} not found", hex(id))))
    }

    fn balance_of(&self, id: &[u8; 32]) -> Outcome<u64> {
        self.identities
            .get(id)
            .map(|r| r.balance)
            .ok_or_else(|| Failure::not_found(format!("identity {} not found", hex(id))))
    }

    fn set_balance(&mut self, id: &[u8; 32], balance: u64) {
        if let Some(record) = self.identities.get_mut(id) {
            record.balance = balance;
        }
    }

    /// Stores a published record and refreshes the handle it came through.
    fn sync(&mut self, handle: RawHandle, record: DocumentRecord) {
        self.objects
            .insert(handle.addr(), Object::Document(record.clone()));
        self.documents.insert(record.id, record);
    }

    fn owned_by_signer(&self, record: &DocumentRecord, publish: &RawDocumentPublish<'_>) -> Outcome<()> {
        if self.identity_id(publish.signer)? == record.owner {
            Ok(())
        } else {
            Err(Failure::crypto("signer does not own the document"))
        }
    }

    fn check_contract(&self, record: &DocumentRecord, publish: &RawDocumentPublish<'_>) -> Outcome<()> {
        if let Some(contract) = publish.data_contract {
            if self.contract(contract)?.id != record.contract_id {
                return Err(Failure::invalid("document does not belong to the given data contract"));
            }
        }
        Ok(())
    }

    pub(super) fn register_opaque(&mut self) -> Outcome<RawHandle> {
        self.allocate(Object::Opaque)
    }

    pub(super) fn release(&mut self, handle: RawHandle, kind: HandleKind) -> Released {
        match self.objects.get(&handle.addr()) {
            None => Released::Missing,
            Some(object) if !object.is(kind) => Released::WrongKind,
            Some(_) => {
                self.objects.remove(&handle.addr());
                Released::Freed
            }
        }
    }

    pub(super) fn live_handles(&self) -> usize {
        self.objects
            .values()
            .filter(|o| !matches!(o, Object::Session))
            .count()
    }

    pub(super) fn identity_ids(&self) -> Vec<[u8; 32]> {
        self.identity_order.clone()
    }

    pub(super) fn open_session(&mut self) -> Outcome<Payload> {
        self.allocate(Object::Session).map(Payload::Session)
    }

    // Identities

    pub(super) fn create_identity(&mut self, sdk: RawHandle) -> Outcome<Payload> {
        self.session(sdk)?;
        let id: [u8; 32] = rand::random();
        self.identities.insert(
            id,
            IdentityRecord {
                balance: self.default_balance,
                revision: 0,
                public_keys: self.default_public_keys,
            },
        );
        self.identity_order.push(id);
        self.allocate(Object::Identity(id)).map(Payload::Identity)
    }

    pub(super) fn fetch_identity(&mut self, sdk: RawHandle, id: &[u8; 32]) -> Outcome<Payload> {
        self.session(sdk)?;
        self.balance_of(id)?;
        self.allocate(Object::Identity(*id)).map(Payload::Identity)
    }

    pub(super) fn identity_summary(&self, handle: RawHandle) -> Option<IdentitySummary> {
        let id = self.identity_id(handle).ok()?;
        let record = self.identities.get(&id)?;
        Some(IdentitySummary {
            id: hex(&id),
            balance: record.balance,
            revision: record.revision,
            public_keys: record.public_keys,
        })
    }

    pub(super) fn identity_balance(&self, sdk: RawHandle, id: &[u8; 32]) -> Outcome<Payload> {
        self.session(sdk)?;
        self.balance_of(id).map(|b| Payload::Text(b.to_string()))
    }

    pub(super) fn identity_balances(&self, sdk: RawHandle, ids: &[[u8; 32]]) -> Outcome<Payload> {
        self.session(sdk)?;
        let entries = ids
            .iter()
            .map(|id| BalanceEntry {
                identity_id: *id,
                balance: self
                    .identities
                    .get(id)
                    .map_or(BalanceEntry::NOT_FOUND, |r| r.balance),
            })
            .collect();
        Ok(Payload::Balances(entries))
    }

    pub(super) fn transfer_credits(
        &mut self,
        sdk: RawHandle,
        from: RawHandle,
        to: &[u8; 32],
        amount: u64,
    ) -> Outcome<Payload> {
        self.session(sdk)?;
        let from = self.identity_id(from)?;
        if amount == 0 {
            return Err(Failure::invalid("amount must be positive"));
        }
        if from == *to {
            return Err(Failure::invalid("sender and recipient are the same identity"));
        }
        let sender = self.balance_of(&from)?;
        let receiver = self.balance_of(to)?;
        if sender < amount {
            return Err(Failure::state(format!(
                "insufficient balance: {sender} available, {amount} required"
            )));
        }
        let receiver = receiver
            .checked_add(amount)
            .ok_or_else(|| Failure::state("recipient balance overflow"))?;
        let sender = sender - amount;

        self.set_balance(&from, sender);
        self.set_balance(to, receiver);
        if let Some(record) = self.identities.get_mut(&from) {
            record.revision += 1;
        }
        let body = json!({ "senderBalance": sender, "receiverBalance": receiver });
        Ok(Payload::Text(body.to_string()))
    }

    // Data contracts

    pub(super) fn create_contract(&mut self, sdk: RawHandle, owner: RawHandle, schemas: &CStr) -> Outcome<Payload> {
        self.session(sdk)?;
        let owner = self.identity_id(owner)?;
        let schemas = parse_map(schemas, "document schemas")?;
        if schemas.is_empty() {
            return Err(Failure::invalid("contract defines no document types"));
        }
        if let Some((name, _)) = schemas.iter().find(|(_, s)| s.as_map().is_none()) {
            return Err(Failure::invalid(format!("schema of '{name}' is not an object")));
        }
        let id = self.derive_id(&[b"contract", &owner]);
        let record = ContractRecord {
            id,
            owner,
            version: 1,
            schemas,
        };
        self.allocate(Object::Contract(record)).map(Payload::Contract)
    }

    pub(super) fn fetch_contract(&mut self, sdk: RawHandle, id: &[u8; 32]) -> Outcome<Payload> {
        self.session(sdk)?;
        let record = self
            .contracts
            .get(id)
            .cloned()
            .ok_or_else(|| Failure::not_found(format!("data contract {} not found", hex(id))))?;
        self.allocate(Object::Contract(record)).map(Payload::Contract)
    }

    pub(super) fn contract_info(&self, handle: RawHandle) -> Outcome<Payload> {
        let record = self.contract(handle)?;
        let body = json!({
            "id": hex(&record.id),
            "ownerId": hex(&record.owner),
            "version": record.version,
            "documentTypes": record.schemas.keys().collect::<Vec<_>>(),
        });
        Ok(Payload::Text(body.to_string()))
    }

    pub(super) fn contract_schema(&self, handle: RawHandle, document_type: &CStr) -> Outcome<Payload> {
        let record = self.contract(handle)?;
        let document_type = text(document_type, "document type")?;
        let schema = record
            .schemas
            .get(document_type)
            .ok_or_else(|| Failure::not_found(format!("document type '{document_type}' not found")))?;
        to_json(schema)
            .map_err(|e| Failure::serialization(e.to_string()))
            .map(Payload::Text)
    }

    pub(super) fn serialize_contract(&self, handle: RawHandle) -> Outcome<Payload> {
        let record = self.contract(handle)?;
        let mut body = ValueMap::new();
        body.insert("id".into(), Value::from(hex(&record.id)));
        body.insert("ownerId".into(), Value::from(hex(&record.owner)));
        body.insert("version".into(), Value::from(record.version));
        body.insert("documentSchemas".into(), Value::Map(record.schemas.clone()));
        map_to_json(&body)
            .map(|json| Payload::Bytes(json.into_bytes()))
            .map_err(|e| Failure::serialization(e.to_string()))
    }

    pub(super) fn publish_contract(&mut self, sdk: RawHandle, handle: RawHandle, signer: RawHandle) -> Outcome<Payload> {
        self.session(sdk)?;
        let signer = self.identity_id(signer)?;
        let mut record = self.contract(handle)?.clone();
        if signer != record.owner {
            return Err(Failure::crypto("signer does not own the data contract"));
        }
        if let Some(existing) = self.contracts.get(&record.id) {
            record.version = existing.version + 1;
        }
        self.objects
            .insert(handle.addr(), Object::Contract(record.clone()));
        self.contracts.insert(record.id, record);
        Ok(Payload::None)
    }

    // Documents

    pub(super) fn create_document(&mut self, sdk: RawHandle, params: &RawDocumentCreateParams<'_>) -> Outcome<Payload> {
        self.session(sdk)?;
        let document_type = text(params.document_type, "document type")?.to_string();
        let (contract_id, schema) = {
            let contract = self.contract(params.data_contract)?;
            let schema = contract.schemas.get(&document_type).cloned().ok_or_else(|| {
                Failure::invalid(format!(
                    "document type '{document_type}' is not defined by the data contract"
                ))
            })?;
            (contract.id, schema)
        };
        let owner = self.identity_id(params.owner_identity)?;
        let data = parse_map(params.properties_json, "document properties")?;
        check_required(&document_type, &schema, &data)?;

        let id = self.derive_id(&[b"document", &contract_id, &owner, document_type.as_bytes()]);
        let now = self.tick();
        let record = DocumentRecord {
            id,
            owner,
            contract_id,
            document_type,
            revision: 1,
            created_at: now,
            updated_at: now,
            price: None,
            data,
        };
        self.allocate(Object::Document(record)).map(Payload::Document)
    }

    pub(super) fn fetch_document(
        &mut self,
        sdk: RawHandle,
        contract: RawHandle,
        document_type: &CStr,
        id: &[u8; 32],
    ) -> Outcome<Payload> {
        self.session(sdk)?;
        let contract_id = self.contract(contract)?.id;
        let document_type = text(document_type, "document type")?;
        let record = self
            .documents
            .get(id)
            .filter(|d| d.contract_id == contract_id && d.document_type == document_type)
            .cloned()
            .ok_or_else(|| Failure::not_found(format!("document {} not found", hex(id))))?;
        self.allocate(Object::Document(record)).map(Payload::Document)
    }

    pub(super) fn document_summary(&self, handle: RawHandle) -> Option<DocumentSummary> {
        let record = self.document(handle).ok()?;
        Some(DocumentSummary {
            id: hex(&record.id),
            owner_id: hex(&record.owner),
            data_contract_id: hex(&record.contract_id),
            document_type: record.document_type.clone(),
            revision: record.revision,
            created_at: millis(record.created_at),
            updated_at: millis(record.updated_at),
            data_json: map_to_json(&record.data).ok()?,
        })
    }

    pub(super) fn set_properties(&mut self, handle: RawHandle, properties: &CStr) -> Outcome<Payload> {
        let data = parse_map(properties, "document properties")?;
        self.document_mut(handle)?.data = data;
        Ok(Payload::None)
    }

    pub(super) fn set_property(&mut self, handle: RawHandle, path: &CStr, value: &CStr) -> Outcome<Payload> {
        let path = text(path, "property path")?;
        let value = from_json(text(value, "property value")?)
            .map_err(|e| Failure::serialization(e.to_string()))?;
        let record = self.document_mut(handle)?;
        // Edit a copy so a failed walk leaves the document untouched.
        let mut data = record.data.clone();
        set_at_path(&mut data, path, value).map_err(|e| Failure::invalid(e.to_string()))?;
        record.data = data;
        Ok(Payload::None)
    }

    pub(super) fn remove_property(&mut self, handle: RawHandle, path: &CStr) -> Outcome<Payload> {
        let path = text(path, "property path")?;
        let record = self.document_mut(handle)?;
        remove_at_path(&mut record.data, path).map_err(|e| Failure::invalid(e.to_string()))?;
        Ok(Payload::None)
    }

    pub(super) fn search(
        &self,
        sdk: RawHandle,
        contract: RawHandle,
        document_type: &CStr,
        query_json: &CStr,
    ) -> Outcome<Payload> {
        self.session(sdk)?;
        let contract_id = self.contract(contract)?.id;
        let document_type = text(document_type, "document type")?;
        let query = query::parse(text(query_json, "query")?)?;

        let candidates = self
            .documents
            .values()
            .filter(|d| d.contract_id == contract_id && d.document_type == document_type)
            .map(DocumentRecord::to_search_result)
            .collect();
        let page = query::run(&query, candidates)?;

        let mut body = ValueMap::new();
        body.insert(
            "documents".into(),
            Value::Array(page.documents.into_iter().map(Value::Map).collect()),
        );
        body.insert("total_count".into(), Value::from(page.total_count as u64));
        map_to_json(&body)
            .map(Payload::Text)
            .map_err(|e| Failure::serialization(e.to_string()))
    }

    pub(super) fn put_document(&mut self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> Outcome<Payload> {
        self.session(sdk)?;
        let record = self.document(publish.document)?.clone();
        self.check_contract(&record, publish)?;
        self.owned_by_signer(&record, publish)?;
        check_payment(publish.token_payment)?;
        if !self.contracts.contains_key(&record.contract_id) {
            return Err(Failure::state("data contract is not published"));
        }
        if self.documents.contains_key(&record.id) {
            return Err(Failure::state(format!("document {} already exists", hex(&record.id))));
        }
        self.documents.insert(record.id, record);
        Ok(Payload::None)
    }

    pub(super) fn replace_document(&mut self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> Outcome<Payload> {
        self.session(sdk)?;
        let local = self.document(publish.document)?.clone();
        self.check_contract(&local, publish)?;
        check_payment(publish.token_payment)?;
        let current = self.published(&local.id)?;
        self.owned_by_signer(&current, publish)?;

        let next = DocumentRecord {
            revision: current.revision + 1,
            updated_at: self.tick(),
            data: local.data,
            ..current
        };
        self.sync(publish.document, next);
        Ok(Payload::None)
    }

    pub(super) fn delete_document(&mut self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> Outcome<Payload> {
        self.session(sdk)?;
        let id = self.document(publish.document)?.id;
        let current = self.published(&id)?;
        self.owned_by_signer(&current, publish)?;
        self.documents.remove(&id);
        Ok(Payload::None)
    }

    pub(super) fn transfer_document(
        &mut self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
        recipient: &[u8; 32],
    ) -> Outcome<Payload> {
        self.session(sdk)?;
        check_payment(publish.token_payment)?;
        let id = self.document(publish.document)?.id;
        let current = self.published(&id)?;
        self.owned_by_signer(&current, publish)?;
        self.balance_of(recipient)?;
        if *recipient == current.owner {
            return Err(Failure::invalid("recipient already owns the document"));
        }

        let from = current.owner;
        let now = self.tick();
        let transaction = self.derive_id(&[b"transfer", &id, recipient]);
        let next = DocumentRecord {
            owner: *recipient,
            revision: current.revision + 1,
            updated_at: now,
            price: None,
            ..current
        };
        self.sync(publish.document, next);

        let body = json!({
            "transactionId": hex(&transaction),
            "fromIdentityId": hex(&from),
            "toIdentityId": hex(recipient),
            "documentId": hex(&id),
            "transferredAt": now,
        });
        Ok(Payload::Text(body.to_string()))
    }

    pub(super) fn purchase_document(&mut self, sdk: RawHandle, publish: &RawDocumentPublish<'_>) -> Outcome<Payload> {
        self.session(sdk)?;
        let buyer = self.identity_id(publish.signer)?;
        let id = self.document(publish.document)?.id;
        let current = self.published(&id)?;
        let price = current
            .price
            .ok_or_else(|| Failure::state("document is not for sale"))?;
        if buyer == current.owner {
            return Err(Failure::invalid("purchaser already owns the document"));
        }
        let buyer_balance = self.balance_of(&buyer)?;
        if buyer_balance < price {
            return Err(Failure::state(format!(
                "insufficient balance: {buyer_balance} available, {price} required"
            )));
        }
        let seller_balance = self.balance_of(&current.owner)?.saturating_add(price);

        self.set_balance(&buyer, buyer_balance - price);
        self.set_balance(&current.owner, seller_balance);
        let next = DocumentRecord {
            owner: buyer,
            revision: current.revision + 1,
            updated_at: self.tick(),
            price: None,
            ..current
        };
        self.sync(publish.document, next);
        Ok(Payload::None)
    }

    pub(super) fn update_document_price(
        &mut self,
        sdk: RawHandle,
        publish: &RawDocumentPublish<'_>,
        price: u64,
    ) -> Outcome<Payload> {
        self.session(sdk)?;
        let id = self.document(publish.document)?.id;
        let current = self.published(&id)?;
        self.owned_by_signer(&current, publish)?;
        let next = DocumentRecord {
            revision: current.revision + 1,
            updated_at: self.tick(),
            price: Some(price),
            ..current
        };
        self.sync(publish.document, next);
        Ok(Payload::None)
    }

    pub(super) fn destroy_document(&mut self, sdk: RawHandle, handle: RawHandle) -> Outcome<Payload> {
        self.session(sdk)?;
        let id = self.document(handle)?.id;
        self.published(&id)?;
        self.documents.remove(&id);
        Ok(Payload::None)
    }
}
