//! Protocol scenarios driven against `LedgerState` with a synthetic
//! clock. Times are plain unix seconds; no sleeping.

use obscura_compute::encode_bool;

use crate::error::LedgerError;
use crate::events::ProtocolEvent;
use crate::ledger::bridge::RequestStatus;

use super::*;

// ----------------------------------------------------------------------
// Submission
// ----------------------------------------------------------------------

#[test]
fn non_provider_submit_always_unauthorized() {
    let mut h = harness();
    let handle = h.engine.seal_value(10).unwrap();

    // Regardless of pause, cooldown or batch state, the provider check
    // comes first.
    assert!(matches!(
        h.state.submit(STRANGER, handle.clone(), 100),
        Err(LedgerError::NotProvider { .. })
    ));

    h.state.set_paused(OWNER, true).unwrap();
    assert!(matches!(
        h.state.submit(STRANGER, handle.clone(), 100),
        Err(LedgerError::NotProvider { .. })
    ));

    h.state.set_paused(OWNER, false).unwrap();
    h.state.close_current_batch(OWNER).unwrap();
    assert!(matches!(
        h.state.submit(STRANGER, handle, 100),
        Err(LedgerError::NotProvider { .. })
    ));
}

#[test]
fn paused_ledger_rejects_provider_submission() {
    let mut h = harness().with_provider();
    let handle = h.engine.seal_value(10).unwrap();

    h.state.set_paused(OWNER, true).unwrap();
    assert!(matches!(
        h.state.submit(PROVIDER, handle.clone(), 100),
        Err(LedgerError::Paused)
    ));

    h.state.set_paused(OWNER, false).unwrap();
    assert!(h.state.submit(PROVIDER, handle, 100).is_ok());
}

#[test]
fn submission_cooldown_blocks_then_clears() {
    let mut h = harness().with_provider();

    let first = h.engine.seal_value(1).unwrap();
    let second = h.engine.seal_value(2).unwrap();

    assert!(h.state.submit(PROVIDER, first, 100).is_ok());

    // Within the cooldown window the second submission fails and leaves
    // no trace.
    let err = h
        .state
        .submit(PROVIDER, second.clone(), 100 + COOLDOWN_SECS - 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::CooldownActive { remaining_secs: 1 }));
    assert_eq!(h.state.stats().current_batch_submissions, 1);

    // Once it elapses, the submission goes through.
    let receipt = h
        .state
        .submit(PROVIDER, second, 100 + COOLDOWN_SECS)
        .unwrap();
    assert_eq!(receipt.index, 1);
}

#[test]
fn indices_are_dense_across_providers() {
    let mut h = harness().with_provider();
    let other = Address([9u8; 32]);
    h.state.add_provider(OWNER, other).unwrap();

    let r0 = h
        .state
        .submit(PROVIDER, h.engine.seal_value(1).unwrap(), 100)
        .unwrap();
    let r1 = h
        .state
        .submit(other, h.engine.seal_value(2).unwrap(), 100)
        .unwrap();
    let r2 = h
        .state
        .submit(PROVIDER, h.engine.seal_value(3).unwrap(), 200)
        .unwrap();

    assert_eq!((r0.batch_id, r0.index), (1, 0));
    assert_eq!((r1.batch_id, r1.index), (1, 1));
    assert_eq!((r2.batch_id, r2.index), (1, 2));
}

#[test]
fn close_then_reopen_restarts_indices() {
    let mut h = harness().with_provider();

    let mut now = 100;
    for expected in 0..3 {
        let receipt = h
            .state
            .submit(PROVIDER, h.engine.seal_value(expected).unwrap(), now)
            .unwrap();
        assert_eq!(receipt, crate::ledger::SubmissionReceipt {
            batch_id: 1,
            index: expected,
        });
        now += COOLDOWN_SECS;
    }
    assert_eq!(h.state.batch_info(1).unwrap().submissions, 3);

    assert_eq!(h.state.close_current_batch(OWNER).unwrap(), 1);

    // A fourth submission fails with a state error, permanently.
    assert!(matches!(
        h.state
            .submit(PROVIDER, h.engine.seal_value(9).unwrap(), now),
        Err(LedgerError::BatchClosed { batch_id: 1 })
    ));

    // A fresh batch starts its own counter at 0.
    assert_eq!(h.state.open_new_batch(OWNER).unwrap(), 2);
    let receipt = h
        .state
        .submit(PROVIDER, h.engine.seal_value(9).unwrap(), now)
        .unwrap();
    assert_eq!((receipt.batch_id, receipt.index), (2, 0));
}

// ----------------------------------------------------------------------
// Administration
// ----------------------------------------------------------------------

#[test]
fn admin_calls_are_owner_gated() {
    let mut h = harness();

    assert!(matches!(
        h.state.add_provider(STRANGER, PROVIDER),
        Err(LedgerError::NotOwner { .. })
    ));
    assert!(matches!(
        h.state.set_paused(STRANGER, true),
        Err(LedgerError::NotOwner { .. })
    ));
    assert!(matches!(
        h.state.open_new_batch(STRANGER),
        Err(LedgerError::NotOwner { .. })
    ));
    assert!(matches!(
        h.state.close_current_batch(STRANGER),
        Err(LedgerError::NotOwner { .. })
    ));

    // Transfer, then the old owner loses the capability.
    h.state.transfer_ownership(OWNER, STRANGER).unwrap();
    assert!(matches!(
        h.state.open_new_batch(OWNER),
        Err(LedgerError::NotOwner { .. })
    ));
    assert!(h.state.open_new_batch(STRANGER).is_ok());
}

#[test]
fn provider_registration_is_idempotent_without_duplicate_events() {
    let mut h = harness();

    h.state.add_provider(OWNER, PROVIDER).unwrap();
    h.state.add_provider(OWNER, PROVIDER).unwrap();
    h.state.remove_provider(OWNER, STRANGER).unwrap();

    let events: Vec<_> = h
        .state
        .events_snapshot()
        .into_iter()
        .filter(|ev| {
            matches!(
                ev,
                ProtocolEvent::ProviderAdded { .. } | ProtocolEvent::ProviderRemoved { .. }
            )
        })
        .collect();
    assert_eq!(events, vec![ProtocolEvent::ProviderAdded { provider: PROVIDER }]);
}

// ----------------------------------------------------------------------
// Analysis requests
// ----------------------------------------------------------------------

#[test]
fn request_analysis_registers_pending_context() {
    let mut h = harness().with_provider();
    h.state
        .submit(PROVIDER, h.engine.seal_value(42).unwrap(), 100)
        .unwrap();

    let threshold = h.engine.seal_value(40).unwrap();
    let request_id = h
        .state
        .request_analysis(ANALYST, 1, 0, threshold, 110)
        .unwrap();
    assert_eq!(request_id, 1);
    assert_eq!(h.oracle.request_count(), 1);

    let ctx = h.state.request_context(request_id).unwrap();
    assert_eq!(ctx.batch_id, 1);
    assert_eq!(ctx.status, RequestStatus::Pending);
    assert_eq!(ctx.requested_at, 110);
    assert_eq!(ctx.expires_at, 110 + REQUEST_TTL_SECS);
}

#[test]
fn request_analysis_validates_batch_and_index() {
    let mut h = harness().with_provider();
    h.state
        .submit(PROVIDER, h.engine.seal_value(42).unwrap(), 100)
        .unwrap();
    let threshold = h.engine.seal_value(40).unwrap();

    assert!(matches!(
        h.state
            .request_analysis(ANALYST, 7, 0, threshold.clone(), 110),
        Err(LedgerError::UnknownBatch { batch_id: 7 })
    ));
    assert!(matches!(
        h.state
            .request_analysis(ANALYST, 1, 1, threshold.clone(), 110),
        Err(LedgerError::IndexOutOfRange { index: 1, count: 1, .. })
    ));

    h.state.close_current_batch(OWNER).unwrap();
    assert!(matches!(
        h.state.request_analysis(ANALYST, 1, 0, threshold, 110),
        Err(LedgerError::BatchClosed { batch_id: 1 })
    ));
}

#[test]
fn analysis_cooldown_is_independent_of_submission_clock() {
    let mut h = harness().with_provider();
    h.state
        .submit(PROVIDER, h.engine.seal_value(42).unwrap(), 100)
        .unwrap();

    // Same address, same instant: the submission clock does not throttle
    // the analysis clock.
    let threshold = h.engine.seal_value(40).unwrap();
    assert!(
        h.state
            .request_analysis(PROVIDER, 1, 0, threshold.clone(), 100)
            .is_ok()
    );

    // But a second analysis request from the same caller is throttled.
    assert!(matches!(
        h.state.request_analysis(PROVIDER, 1, 0, threshold, 130),
        Err(LedgerError::CooldownActive { .. })
    ));
}

// ----------------------------------------------------------------------
// Oracle callbacks
// ----------------------------------------------------------------------

/// Submit 42, request `>= 40`, return the request id.
fn submitted_request(h: &mut Harness) -> u64 {
    h.state
        .submit(PROVIDER, h.engine.seal_value(42).unwrap(), 100)
        .unwrap();
    let threshold = h.engine.seal_value(40).unwrap();
    h.state
        .request_analysis(ANALYST, 1, 0, threshold, 110)
        .unwrap()
}

#[test]
fn callback_happy_path_completes_once() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    let result = h
        .state
        .on_decryption_result(h.oracle_addr, id, &cleartext, &proof)
        .unwrap();
    assert!(result);
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Processed
    );

    let completed: Vec<_> = h
        .state
        .events_snapshot()
        .into_iter()
        .filter(|ev| matches!(ev, ProtocolEvent::DecryptionCompleted { .. }))
        .collect();
    assert_eq!(
        completed,
        vec![ProtocolEvent::DecryptionCompleted {
            request_id: id,
            batch_id: 1,
            result: true,
        }]
    );
}

#[test]
fn callback_from_untrusted_caller_rejected() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    assert!(matches!(
        h.state
            .on_decryption_result(STRANGER, id, &cleartext, &proof),
        Err(LedgerError::NotOracle { .. })
    ));
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Pending
    );
}

#[test]
fn replayed_callback_rejected_regardless_of_payload() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    h.state
        .on_decryption_result(h.oracle_addr, id, &cleartext, &proof)
        .unwrap();

    // Identical payload.
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof),
        Err(LedgerError::ReplayAttempt { .. })
    ));
    // Different payload, same request id.
    let other = encode_bool(false);
    let other_proof = h.proof_for(id, &other);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &other, &other_proof),
        Err(LedgerError::ReplayAttempt { .. })
    ));
}

#[test]
fn unknown_request_id_rejected() {
    let mut h = harness().with_provider();
    let cleartext = encode_bool(true);
    let proof = h.proof_for(99, &cleartext);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, 99, &cleartext, &proof),
        Err(LedgerError::UnknownRequest { request_id: 99 })
    ));
}

#[test]
fn mismatched_cleartext_rejected_then_corrected_retry_succeeds() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    // 42 >= 40, so the bound result is `true`; a flipped cleartext hashes
    // to the wrong handle.
    let wrong = encode_bool(false);
    let wrong_proof = h.proof_for(id, &wrong);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &wrong, &wrong_proof),
        Err(LedgerError::StateMismatch { .. })
    ));
    // So does a malformed payload.
    let garbled = vec![9u8, 9u8];
    let garbled_proof = h.proof_for(id, &garbled);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &garbled, &garbled_proof),
        Err(LedgerError::StateMismatch { .. })
    ));
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Pending
    );

    // The context stayed pending, so the corrected callback succeeds.
    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    assert!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof)
            .unwrap()
    );
}

#[test]
fn invalid_proof_rejected_but_retryable() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    let cleartext = encode_bool(true);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &[0u8; 64]),
        Err(LedgerError::InvalidProof { .. })
    ));
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Pending
    );

    let proof = h.proof_for(id, &cleartext);
    assert!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof)
            .unwrap()
    );
}

#[test]
fn batch_closed_before_callback_discards_result() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    h.state.close_current_batch(OWNER).unwrap();

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof),
        Err(LedgerError::BatchClosed { batch_id: 1 })
    ));
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Pending
    );

    // Terminal: reopening activity via a new batch does not revive the
    // old request.
    h.state.open_new_batch(OWNER).unwrap();
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof),
        Err(LedgerError::BatchClosed { batch_id: 1 })
    ));

    assert!(
        !h.state
            .events_snapshot()
            .iter()
            .any(|ev| matches!(ev, ProtocolEvent::DecryptionCompleted { .. }))
    );
}

#[test]
fn expired_request_rejects_late_callback() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    // Sweep before the deadline touches nothing.
    assert_eq!(h.state.expire_pending(110 + REQUEST_TTL_SECS - 1), 0);
    assert_eq!(h.state.expire_pending(110 + REQUEST_TTL_SECS), 1);
    assert_eq!(
        h.state.request_context(id).unwrap().status,
        RequestStatus::Expired
    );
    assert!(h.state.events_snapshot().contains(&ProtocolEvent::DecryptionExpired {
        request_id: id,
        batch_id: 1,
    }));

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    assert!(matches!(
        h.state
            .on_decryption_result(h.oracle_addr, id, &cleartext, &proof),
        Err(LedgerError::RequestExpired { .. })
    ));
}

#[test]
fn stats_track_requests_and_records() {
    let mut h = harness().with_provider();
    let id = submitted_request(&mut h);

    let stats = h.state.stats();
    assert_eq!(stats.current_batch_id, 1);
    assert_eq!(stats.current_batch_submissions, 1);
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.pending_requests, 1);
    assert_eq!(stats.processed_requests, 0);

    let cleartext = encode_bool(true);
    let proof = h.proof_for(id, &cleartext);
    h.state
        .on_decryption_result(h.oracle_addr, id, &cleartext, &proof)
        .unwrap();

    let stats = h.state.stats();
    assert_eq!(stats.pending_requests, 0);
    assert_eq!(stats.processed_requests, 1);
}
