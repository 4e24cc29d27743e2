//! Integration tests for identity balances and credit transfers.

use platsdk_bridge::{ErrorKind, IdentityId, MockCore};
use platsdk_testkit::TestPlatform;

#[test]
fn batch_lookup_skips_unknown_identities() {
    let platform = TestPlatform::new();
    let mut second = platform.new_identity();
    let owner = platform.owner_id();
    let second_id = second.id().unwrap();
    let unknown = IdentityId::from_bytes([7; 32]);

    let balances = platform
        .sdk
        .identities()
        .fetch_balances(&[owner, unknown, second_id])
        .unwrap();
    assert_eq!(balances.len(), 2);
    assert!(!balances.contains_key(&unknown.to_hex()));
    assert_eq!(balances[&owner.to_hex()], MockCore::DEFAULT_IDENTITY_BALANCE);

    let none = platform.sdk.identities().fetch_balances(&[unknown]).unwrap();
    assert!(none.is_empty());
    assert_eq!(platform.core.outstanding_allocations(), 0);
}

#[test]
fn keys_are_lowercase_hex_whatever_the_input() {
    let platform = TestPlatform::new();
    let owner = platform.owner_id();
    let upper = owner.to_hex().to_uppercase();
    let parsed = IdentityId::from_hex(&upper).unwrap();
    assert_eq!(parsed, owner);

    let balances = platform.sdk.identities().fetch_balances(&[parsed]).unwrap();
    let key = balances.keys().next().unwrap();
    assert_eq!(key, &owner.to_hex());
    assert!(!key.chars().any(|c| c.is_ascii_uppercase()));
}

#[test]
fn duplicate_ids_collapse() {
    let platform = TestPlatform::new();
    let owner = platform.owner_id();

    let balances = platform
        .sdk
        .identities()
        .fetch_balances(&[owner, owner, owner])
        .unwrap();
    assert_eq!(balances.len(), 1);
}

#[test]
fn empty_batch_is_a_validation_error() {
    let platform = TestPlatform::new();
    let calls = platform.core.stats().boundary_calls;

    let err = platform.sdk.identities().fetch_balances(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(platform.core.stats().boundary_calls, calls);
}

#[test]
fn transfers_move_credits_between_identities() {
    let platform = TestPlatform::new();
    let mut sender = platform.sdk.identities().fetch(&platform.owner_id()).unwrap();
    let mut receiver = platform.new_identity();
    let receiver_id = receiver.id().unwrap();

    let result = sender.transfer_credits(&receiver_id, 1_000, None).unwrap();
    assert_eq!(result.sender_balance, MockCore::DEFAULT_IDENTITY_BALANCE - 1_000);
    assert_eq!(result.receiver_balance, MockCore::DEFAULT_IDENTITY_BALANCE + 1_000);
    assert_eq!(sender.balance().unwrap(), result.sender_balance);
    assert_eq!(receiver.balance().unwrap(), MockCore::DEFAULT_IDENTITY_BALANCE);
    receiver.refresh();
    assert_eq!(receiver.balance().unwrap(), result.receiver_balance);
    assert_eq!(
        platform.sdk.identities().fetch_balance(&receiver_id).unwrap(),
        result.receiver_balance
    );
}

#[test]
fn transfer_rejections() {
    let platform = TestPlatform::new();
    let mut sender = platform.new_identity();
    let sender_id = sender.id().unwrap();
    let receiver = platform.owner_id();

    let err = sender.transfer_credits(&receiver, 0, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    let err = sender.transfer_credits(&sender_id, 10, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let err = sender
        .transfer_credits(&receiver, MockCore::DEFAULT_IDENTITY_BALANCE + 1, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = sender
        .transfer_credits(&IdentityId::from_bytes([9; 32]), 10, None)
        .unwrap_err();
    assert!(err.is_not_found());
}
