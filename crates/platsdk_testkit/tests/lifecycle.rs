//! Integration tests for session and handle lifecycle.

use platsdk_bridge::{
    DocumentCreateParams, ErrorCode, ErrorKind, MockCore, PlatformEntity, QueryBuilder, Sdk,
    SdkConfig, SdkError,
};
use platsdk_testkit::TestPlatform;
use std::sync::Arc;

fn assert_closed(err: SdkError) {
    assert_eq!(err.kind(), ErrorKind::ContextClosed, "unexpected error: {err}");
}

#[test]
fn closed_session_rejects_every_operation_without_core_calls() {
    let mut platform = TestPlatform::new();
    let owner_id = platform.owner_id();
    let mut note = platform.publish_note(r#"{"message":"kept"}"#);
    let mut owner = platform.sdk.identities().fetch(&owner_id).unwrap();
    owner.get_info().unwrap();
    let other = platform.new_identity();

    platform.sdk.close();
    assert!(platform.sdk.is_closed());
    let calls = platform.core.stats().boundary_calls;

    let sdk = &platform.sdk;
    assert_closed(sdk.identities().create().unwrap_err());
    assert_closed(sdk.identities().fetch(&owner_id).unwrap_err());
    assert_closed(sdk.identities().fetch_balance(&owner_id).unwrap_err());
    // Local validation would reject these too; the gate comes first.
    assert_closed(sdk.identities().fetch_balances(&[]).unwrap_err());
    assert_closed(owner.transfer_credits(&owner_id, 0, None).unwrap_err());
    assert_closed(owner.get_info().unwrap_err());

    assert_closed(sdk.contracts().create(&other, &Default::default()).unwrap_err());
    assert_closed(platform.contract.schema("").unwrap_err());
    assert_closed(platform.contract.to_bytes().unwrap_err());

    assert_closed(note.get_property("message").unwrap_err());
    assert_closed(note.set_property("bad..path", 1).unwrap_err());
    assert_closed(note.remove_property("message").unwrap_err());
    assert_closed(
        note.put_and_wait(&platform.contract, &platform.owner, None, None)
            .unwrap_err(),
    );
    assert_closed(note.delete(&platform.owner, None).unwrap_err());
    assert_closed(
        sdk.documents()
            .search(&platform.contract, "", &QueryBuilder::new().build())
            .unwrap_err(),
    );
    assert_closed(platform.contract.get_info().unwrap_err());

    assert_eq!(platform.core.stats().boundary_calls, calls);
}

#[test]
fn close_is_idempotent_and_shared_by_clones() {
    let platform = TestPlatform::new();
    let clone = platform.sdk.clone();

    clone.close();
    platform.sdk.close();
    assert!(platform.sdk.is_closed());
    assert_eq!(platform.core.stats().sessions_destroyed, 1);
}

#[test]
fn release_destroys_the_handle_once() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"short-lived"}"#);
    let before = platform.core.stats().handles_destroyed;

    assert!(note.has_handle());
    note.release();
    note.release();
    assert!(note.is_released());
    assert!(!note.has_handle());
    assert_eq!(platform.core.stats().handles_destroyed, before + 1);
    assert_eq!(platform.core.stats().double_frees, 0);

    let err = note.set_property("message", "again").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = note.get_info().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn dropping_entities_reclaims_handles() {
    let platform = TestPlatform::new();
    let baseline = platform.core.live_handles();

    let notes: Vec<_> = (0..5)
        .map(|i| platform.note_json(&format!(r#"{{"message":"n{i}"}}"#)))
        .collect();
    let identity = platform.new_identity();
    assert_eq!(platform.core.live_handles(), baseline + 6);

    drop(notes);
    drop(identity);
    assert_eq!(platform.core.live_handles(), baseline);
    assert_eq!(platform.core.stats().double_frees, 0);
}

#[test]
fn session_outlives_sdk_until_entities_drop() {
    let core = Arc::new(MockCore::new());
    let sdk = Sdk::open(core.clone(), SdkConfig::default()).unwrap();
    let identity = sdk.identities().create().unwrap();

    drop(sdk);
    assert_eq!(core.stats().sessions_destroyed, 0);

    drop(identity);
    assert_eq!(core.stats().sessions_destroyed, 1);
    assert_eq!(core.live_handles(), 0);
}

#[test]
fn native_errors_carry_code_and_context() {
    let platform = TestPlatform::new();
    let owner = platform.owner_id();

    platform.core.fail_next(ErrorCode::Timeout, "platform did not answer");
    let err = platform.sdk.identities().fetch_balance(&owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.code(), Some(ErrorCode::Timeout));
    assert_eq!(
        err.to_string(),
        "failed to fetch identity balance: [Timeout] platform did not answer"
    );

    // One-shot.
    assert_eq!(
        platform.sdk.identities().fetch_balance(&owner).unwrap(),
        MockCore::DEFAULT_IDENTITY_BALANCE
    );
}

#[test]
fn native_memory_is_returned() {
    let platform = TestPlatform::new();
    let mut note = platform.publish_note(r#"{"message":"m","score":3}"#);
    note.set_property("meta.tag", "t").unwrap();
    note.get_info().unwrap();
    platform.core.fail_next(ErrorCode::NotFound, "nope");
    let _ = platform.sdk.identities().fetch(&platform.owner_id());
    let _ = platform.contract.to_bytes().unwrap();
    let _ = platform
        .sdk
        .identities()
        .fetch_balances(&[platform.owner_id()])
        .unwrap();
    let _ = platform
        .sdk
        .documents()
        .search(&platform.contract, "note", &QueryBuilder::new().build())
        .unwrap();

    assert_eq!(platform.core.outstanding_allocations(), 0);
    assert_eq!(platform.core.stats().double_frees, 0);
}

#[test]
fn entities_of_a_closed_session_are_refused_elsewhere() {
    let closed = TestPlatform::new();
    let open = TestPlatform::new();
    closed.sdk.close();
    let calls = open.core.stats().boundary_calls;

    let schemas = platsdk_value::map_from_json(platsdk_testkit::NOTE_SCHEMAS).unwrap();
    assert_closed(open.sdk.contracts().create(&closed.owner, &schemas).unwrap_err());

    let mut contract = open.sdk.contracts().create(&open.owner, &schemas).unwrap();
    let after_create = open.core.stats().boundary_calls;
    assert_closed(contract.put_and_wait(&closed.owner, None).unwrap_err());

    let properties = platsdk_value::map_from_json(r#"{"message":"m"}"#).unwrap();
    let err = open
        .sdk
        .documents()
        .create(DocumentCreateParams {
            data_contract: &open.contract,
            document_type: platsdk_testkit::NOTE_TYPE,
            owner: &closed.owner,
            properties: &properties,
        })
        .unwrap_err();
    assert_closed(err);
    assert_closed(
        open.sdk
            .documents()
            .search(&closed.contract, platsdk_testkit::NOTE_TYPE, &QueryBuilder::new().build())
            .unwrap_err(),
    );
    assert_eq!(open.core.stats().boundary_calls, after_create);
    assert!(after_create > calls);
}

#[test]
fn entities_of_another_open_session_are_invalid_arguments() {
    let first = TestPlatform::new();
    let second = TestPlatform::new();
    let mut note = first.note_json(r#"{"message":"m"}"#);

    let err = note
        .put_and_wait(&first.contract, &second.owner, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(err.to_string(), "identity belongs to a different SDK session");

    let err = note
        .put_and_wait(&second.contract, &first.owner, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(!note.is_released());
}
