use obscura_account::Address;
use obscura_handle::{CiphertextHandle, state_hash};

fn instance() -> Address {
    Address::derive(b"test-instance")
}

#[test]
fn identical_handles_have_same_hash() {
    let handle = CiphertextHandle::new(vec![9u8; 36]);

    let h1 = state_hash(&instance(), &[&handle]);
    let h2 = state_hash(&instance(), &[&handle]);

    assert_eq!(h1, h2);
}

#[test]
fn different_handles_have_different_hashes() {
    let a = CiphertextHandle::new(vec![1u8; 36]);
    let b = CiphertextHandle::new(vec![2u8; 36]);

    assert_ne!(state_hash(&instance(), &[&a]), state_hash(&instance(), &[&b]));
}

#[test]
fn different_instances_have_different_hashes() {
    let handle = CiphertextHandle::new(vec![9u8; 36]);

    let here = state_hash(&Address::derive(b"instance-a"), &[&handle]);
    let there = state_hash(&Address::derive(b"instance-b"), &[&handle]);

    assert_ne!(here, there);
}

#[test]
fn handle_boundaries_are_length_prefixed() {
    // [12][34] vs [1][234]: same concatenated bytes, different split.
    let a1 = CiphertextHandle::new(vec![1, 2]);
    let a2 = CiphertextHandle::new(vec![3, 4]);
    let b1 = CiphertextHandle::new(vec![1]);
    let b2 = CiphertextHandle::new(vec![2, 3, 4]);

    assert_ne!(
        state_hash(&instance(), &[&a1, &a2]),
        state_hash(&instance(), &[&b1, &b2])
    );
}
