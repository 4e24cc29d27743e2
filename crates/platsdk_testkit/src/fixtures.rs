//! Test fixtures and platform helpers.
//!
//! Provides a mock-backed session with an owner identity and a published
//! one-type contract, plus tracing setup for tests.

use platsdk_bridge::{
    DataContract, Document, DocumentCreateParams, Identity, IdentityId, MockCore, Sdk, SdkConfig,
    ValueMap,
};
use platsdk_value::map_from_json;
use std::sync::{Arc, Once};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Document type defined by the fixture contract.
pub const NOTE_TYPE: &str = "note";

/// Schemas of the fixture contract. `note.message` is required.
pub const NOTE_SCHEMAS: &str = r#"{
    "note": {
        "type": "object",
        "properties": {
            "message": {"type": "string"},
            "score": {"type": "number"},
            "meta": {"type": "object"}
        },
        "required": ["message"]
    }
}"#;

static TRACING: Once = Once::new();

/// Installs a fmt subscriber for test output, once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another harness may have installed a global subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A mock platform with an open session.
pub struct TestPlatform {
    /// The core behind the session, for inspecting counters.
    pub core: Arc<MockCore>,
    /// The session.
    pub sdk: Sdk,
    /// Owner of the fixture contract.
    pub owner: Identity,
    /// Published contract defining [`NOTE_TYPE`].
    pub contract: DataContract,
}

impl TestPlatform {
    /// Creates a platform with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SdkConfig::default())
    }

    /// Creates a platform with `config`.
    pub fn with_config(config: SdkConfig) -> Self {
        init_test_tracing();
        let core = Arc::new(MockCore::new());
        let sdk = Sdk::open(core.clone(), config).expect("Failed to open mock session");
        let owner = sdk
            .identities()
            .create()
            .expect("Failed to create owner identity");

        let schemas = map_from_json(NOTE_SCHEMAS).expect("Invalid fixture schemas");
        let mut contract = sdk
            .contracts()
            .create(&owner, &schemas)
            .expect("Failed to create fixture contract");
        contract
            .put_and_wait(&owner, None)
            .expect("Failed to publish fixture contract");

        debug!("test platform ready");
        Self {
            core,
            sdk,
            owner,
            contract,
        }
    }

    /// ID of the owner identity.
    pub fn owner_id(&self) -> IdentityId {
        self.core.identity_ids()[0]
    }

    /// Creates another identity.
    pub fn new_identity(&self) -> Identity {
        self.sdk
            .identities()
            .create()
            .expect("Failed to create identity")
    }

    /// Creates a local, unpublished note owned by the owner.
    pub fn note(&self, properties: &ValueMap) -> Document {
        self.sdk
            .documents()
            .create(DocumentCreateParams {
                data_contract: &self.contract,
                document_type: NOTE_TYPE,
                owner: &self.owner,
                properties,
            })
            .expect("Failed to create note")
    }

    /// Creates a local note from JSON properties.
    pub fn note_json(&self, json: &str) -> Document {
        let properties = map_from_json(json).expect("Invalid note properties");
        self.note(&properties)
    }

    /// Creates and publishes a note from JSON properties.
    pub fn publish_note(&self, json: &str) -> Document {
        let mut note = self.note_json(json);
        note.put_and_wait(&self.contract, &self.owner, None, None)
            .expect("Failed to publish note");
        note
    }
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a test against a fresh platform.
///
/// # Example
///
/// ```rust
/// use platsdk_testkit::with_platform;
///
/// with_platform(|platform| {
///     let mut note = platform.publish_note(r#"{"message":"hi"}"#);
///     assert!(note.id().unwrap().is_some());
/// });
/// ```
pub fn with_platform<F, R>(f: F) -> R
where
    F: FnOnce(&TestPlatform) -> R,
{
    let platform = TestPlatform::new();
    f(&platform)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use platsdk_bridge::DocumentId;

    /// Creates a platform with `count` published notes.
    ///
    /// Note `i` has message `"note-{i}"`, score `i` and `meta.parity` of
    /// `"even"` or `"odd"`. IDs are returned in creation order.
    pub fn populated_platform(count: usize) -> (TestPlatform, Vec<DocumentId>) {
        let platform = TestPlatform::new();
        let mut ids = Vec::with_capacity(count);

        for i in 0..count {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            let mut note = platform.publish_note(&format!(
                r#"{{"message":"note-{i}","score":{i},"meta":{{"parity":"{parity}"}}}}"#
            ));
            let id = note
                .id()
                .expect("Failed to read note ID")
                .expect("Published note has no ID");
            ids.push(id);
        }

        (platform, ids)
    }
}
