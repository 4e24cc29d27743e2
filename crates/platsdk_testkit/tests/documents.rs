//! Integration tests for documents and the property editor.

use platsdk_bridge::{ErrorKind, PlatformEntity, QueryBuilder, Value};
use platsdk_testkit::{TestPlatform, NOTE_TYPE};
use platsdk_value::map_from_json;

#[test]
fn dotted_paths_create_and_preserve_structure() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m","meta":{"lang":"en","tags":["a"]}}"#);

    note.set_property("meta.author.name", "kari").unwrap();
    note.set_property("meta.lang", "nb").unwrap();

    let expected = map_from_json(
        r#"{"message":"m","meta":{"lang":"nb","tags":["a"],"author":{"name":"kari"}}}"#,
    )
    .unwrap();
    assert_eq!(note.data().unwrap(), &expected);

    note.remove_property("meta.author").unwrap();
    assert_eq!(note.get_property("meta.author").unwrap(), None);
    assert_eq!(note.get_property("meta.lang").unwrap(), Some(Value::from("nb")));

    // Removing a missing path leaves the document alone.
    note.remove_property("meta.nothing.here").unwrap();
    assert_eq!(note.get_property("meta.tags").unwrap(), Some(Value::from(vec!["a"])));
}

#[test]
fn invalid_paths_fail_before_the_core() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m"}"#);
    let calls = platform.core.stats().boundary_calls;

    for path in ["", ".a", "a.", "a..b"] {
        let err = note.set_property(path, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed, "path {path:?}");
        assert!(note.remove_property(path).is_err());
        assert!(note.get_property(path).is_err());
    }
    assert_eq!(platform.core.stats().boundary_calls, calls);
}

#[test]
fn writing_through_a_scalar_is_rejected_by_the_core() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m","score":5}"#);

    let err = note.set_property("score.detail", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(note.get_number("score").unwrap(), Some(5.0));
}

#[test]
fn numbers_read_the_same_in_every_representation() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m","a":41,"b":41.0,"c":"41","d":"forty"}"#);

    assert_eq!(note.get_number("a").unwrap(), Some(41.0));
    assert_eq!(note.get_number("b").unwrap(), Some(41.0));
    assert_eq!(note.get_number("c").unwrap(), Some(41.0));
    assert_eq!(note.get_number("d").unwrap(), None);
    assert_eq!(note.get_number("missing").unwrap(), None);

    note.set_property("big", u64::MAX).unwrap();
    assert_eq!(note.get_number("big").unwrap(), Some(u64::MAX as f64));
}

#[test]
fn set_pushes_whole_map() {
    let platform = TestPlatform::new();
    let mut note = platform.note_json(r#"{"message":"m","score":1}"#);

    note.set("score", 2).unwrap();
    note.set("extra", true).unwrap();
    assert_eq!(note.get("score").unwrap(), Some(Value::from(2)));
    assert_eq!(note.get("extra").unwrap(), Some(Value::Bool(true)));
    assert_eq!(note.get("message").unwrap(), Some(Value::from("m")));
}

#[test]
fn publish_edit_and_sell() {
    let platform = TestPlatform::new();
    let mut buyer = platform.new_identity();
    let buyer_id = buyer.id().unwrap();
    let seller_id = platform.owner_id();

    let mut note = platform.publish_note(r#"{"message":"original","score":1}"#);
    let id = note.id().unwrap().expect("published note has an ID");
    assert_eq!(note.get_info().unwrap().revision, Some(1));

    note.set_property("message", "edited").unwrap();
    note.replace_and_wait(&platform.contract, &platform.owner, None, None)
        .unwrap();
    let mut fetched = platform
        .sdk
        .documents()
        .fetch(&platform.contract, NOTE_TYPE, &id)
        .unwrap();
    assert_eq!(fetched.get("message").unwrap(), Some(Value::from("edited")));
    assert_eq!(fetched.get_info().unwrap().revision, Some(2));

    note.update_price_and_wait(250, &platform.owner, None).unwrap();
    note.purchase_and_wait(&buyer, None).unwrap();
    assert_eq!(note.get_info().unwrap().owner_id, Some(buyer_id));

    let balances = platform
        .sdk
        .identities()
        .fetch_balances(&[buyer_id, seller_id])
        .unwrap();
    buyer.refresh();
    assert_eq!(balances[&buyer_id.to_hex()], buyer.balance().unwrap());
    assert_eq!(balances[&seller_id.to_hex()] - balances[&buyer_id.to_hex()], 500);

    // The previous owner can no longer sign for it.
    assert!(note.delete(&platform.owner, None).is_err());
    note.delete_and_wait(&buyer, None).unwrap();
    let err = platform
        .sdk
        .documents()
        .fetch(&platform.contract, NOTE_TYPE, &id)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn buying_an_unlisted_document_is_invalid_state() {
    let platform = TestPlatform::new();
    let buyer = platform.new_identity();
    let mut note = platform.publish_note(r#"{"message":"not for sale"}"#);

    let err = note.purchase(&buyer, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn transfer_reports_both_parties() {
    let platform = TestPlatform::new();
    let mut recipient = platform.new_identity();
    let recipient_id = recipient.id().unwrap();
    let mut note = platform.publish_note(r#"{"message":"gift"}"#);

    let info = note
        .transfer_and_wait(&recipient_id, &platform.owner, None, None)
        .unwrap();
    assert_eq!(info.from_identity_id, platform.owner_id());
    assert_eq!(info.to_identity_id, recipient_id);
    assert_eq!(Some(info.document_id), note.id().unwrap());
    assert_eq!(info.transaction_id.len(), 64);
}

#[test]
fn search_results_are_detached_copies() {
    let platform = TestPlatform::new();
    let mut original = platform.publish_note(r#"{"message":"findme","score":7}"#);
    let live = platform.core.live_handles();

    let query = QueryBuilder::new().where_eq("message", "findme").build();
    let mut results = platform
        .sdk
        .documents()
        .search(&platform.contract, NOTE_TYPE, &query)
        .unwrap();
    assert_eq!(platform.core.live_handles(), live);
    assert_eq!(results.len(), 1);

    let found = &mut results[0];
    assert!(found.is_search_result());
    assert!(!found.has_handle());
    assert_eq!(found.id().unwrap(), original.id().unwrap());
    assert_eq!(found.get_number("score").unwrap(), Some(7.0));
    assert_eq!(found.get_info().unwrap().owner_id, Some(platform.owner_id()));

    let err = found
        .replace(&platform.contract, &platform.owner, None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandleMissing);

    // Releasing a detached document touches nothing native.
    let destroyed = platform.core.stats().handles_destroyed;
    found.release();
    assert_eq!(platform.core.stats().handles_destroyed, destroyed);
}

#[test]
fn search_results_read_info_without_a_handle() {
    let platform = TestPlatform::new();
    platform.publish_note(r#"{"message":"cached","score":3}"#);

    let query = QueryBuilder::new().where_eq("message", "cached").build();
    let mut results = platform
        .sdk
        .documents()
        .search(&platform.contract, NOTE_TYPE, &query)
        .unwrap();
    let found = &mut results[0];
    let calls = platform.core.stats().boundary_calls;

    found.refresh();
    let info = found.get_info().unwrap();
    assert_eq!(info.document_type, NOTE_TYPE);
    assert_eq!(info.owner_id, Some(platform.owner_id()));
    assert_eq!(info.data.get("score"), Some(&Value::from(3)));
    assert_eq!(platform.core.stats().boundary_calls, calls);

    // A released search result has nothing left to read.
    found.release();
    let err = found.get_info().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}
