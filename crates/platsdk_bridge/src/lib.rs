//! # platsdk Bridge
//!
//! Safe host-side facade over the platform SDK's native core.
//!
//! This crate provides:
//! - Opaque native handles with release-once ownership
//! - A session gate that makes every call fail cleanly after close
//! - In-band result and error decoding
//! - Identities, data contracts and documents, including a dotted-path
//!   property editor
//! - A fluent document query builder
//! - [`MockCore`], an in-memory core for tests and examples
//!
//! ## Ownership
//!
//! The native core owns every handle, string, buffer and balance map it
//! returns. The bridge hands each one back exactly once: decoded payloads
//! are copied into host values and freed immediately, and entity handles are
//! released by [`PlatformEntity::release`] or, as a fallback, on drop.
//!
//! ## Example
//!
//! ```rust
//! use platsdk_bridge::{DocumentCreateParams, QueryBuilder, Sdk, SdkConfig};
//! use platsdk_value::map_from_json;
//!
//! let sdk = Sdk::mock(SdkConfig::default()).unwrap();
//! let owner = sdk.identities().create().unwrap();
//!
//! let schemas = map_from_json(r#"{"note":{"type":"object","required":["message"]}}"#).unwrap();
//! let mut contract = sdk.contracts().create(&owner, &schemas).unwrap();
//! contract.put_and_wait(&owner, None).unwrap();
//!
//! let properties = map_from_json(r#"{"message":"hello","meta":{"lang":"en"}}"#).unwrap();
//! let mut note = sdk
//!     .documents()
//!     .create(DocumentCreateParams {
//!         data_contract: &contract,
//!         document_type: "note",
//!         owner: &owner,
//!         properties: &properties,
//!     })
//!     .unwrap();
//! note.set_property("meta.lang", "nb").unwrap();
//! note.put_and_wait(&contract, &owner, None, None).unwrap();
//!
//! let query = QueryBuilder::new().where_eq("meta.lang", "nb").limit(10).build();
//! let found = sdk.documents().search(&contract, "note", &query).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

#![warn(missing_docs)]

mod config;
mod context;
mod contract;
mod document;
mod error;
mod gate;
mod handle;
mod id;
mod identity;
mod marshal;
mod mock;
mod native;
mod query;
mod result;
mod runtime;
mod settings;

pub use config::{Network, SdkConfig};
pub use context::Sdk;
pub use contract::{ContractInfo, Contracts, DataContract};
pub use document::{Document, DocumentCreateParams, DocumentInfo, DocumentTransferInfo, Documents};
pub use error::{ErrorCode, ErrorKind, SdkError, SdkResult};
pub use handle::{EntityKind, PlatformEntity};
pub use id::{ContractId, DocumentId, Identifier, IdentityId};
pub use identity::{CreditTransfer, Identities, Identity, IdentityInfo};
pub use marshal::{BalanceEntry, NativeBalanceMap, NativeBuffer, NativeError, NativeString};
pub use mock::{MockCore, MockStats};
pub use native::{
    NativeCore, RawConfig, RawDocumentCreateParams, RawDocumentInfo, RawDocumentPublish,
    RawGasFeesPaidBy, RawHandle, RawIdentityInfo, RawNetwork, RawPutSettings, RawResult,
    RawTokenPaymentInfo, ResultData, ResultDataType,
};
pub use platsdk_value::{Value, ValueMap};
pub use query::{Cursor, Direction, DocumentQuery, OrderClause, QueryBuilder};
pub use runtime::{initialize, is_initialized};
pub use settings::{GasFeesPaidBy, PutSettings, TokenPaymentInfo};
