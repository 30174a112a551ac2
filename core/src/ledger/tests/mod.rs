//! Ledger scenario tests
//!
//! `integration` drives `LedgerState` directly with a synthetic clock
//! and a stub oracle; `service` exercises the actor end-to-end with the
//! dev oracle delivering real callbacks.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use ed25519_dalek::{Signer, SigningKey};

use obscura_account::Address;
use obscura_compute::{ComputeError, DecryptionOracle, DevEngine, proof_message};
use obscura_handle::CiphertextHandle;

use super::state::{LedgerConfig, LedgerState};

mod integration;

pub(crate) const OWNER: Address = Address([1u8; 32]);
pub(crate) const PROVIDER: Address = Address([2u8; 32]);
pub(crate) const ANALYST: Address = Address([3u8; 32]);
pub(crate) const STRANGER: Address = Address([4u8; 32]);

pub(crate) const COOLDOWN_SECS: u64 = 60;
pub(crate) const REQUEST_TTL_SECS: u64 = 3600;

/// Oracle stub that issues sequential ids and records the handles it was
/// asked to decrypt, without ever calling back on its own.
pub(crate) struct StubOracle {
    next_id: AtomicU64,
    requests: Mutex<Vec<CiphertextHandle>>,
}

impl StubOracle {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl DecryptionOracle for StubOracle {
    fn request_decryption(&self, handle: CiphertextHandle) -> Result<u64, ComputeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(handle);
        Ok(id)
    }
}

/// State-level test fixture: ledger wired to a dev engine and stub
/// oracle, plus the oracle signing key for crafting callback proofs.
pub(crate) struct Harness {
    pub state: LedgerState,
    pub engine: DevEngine,
    pub signing_key: SigningKey,
    pub oracle_addr: Address,
    pub oracle: Arc<StubOracle>,
}

pub(crate) fn harness() -> Harness {
    let signing_key = SigningKey::from_bytes(&[5u8; 32]);
    let engine = DevEngine::new([7u8; 32], signing_key.verifying_key());
    let oracle_addr = Address::from_pubkey(signing_key.verifying_key().as_bytes());
    let oracle = Arc::new(StubOracle::new());

    let state = LedgerState::new(
        LedgerConfig {
            owner: OWNER,
            instance: Address::derive(b"test-instance"),
            trusted_oracle: oracle_addr,
            cooldown_secs: COOLDOWN_SECS,
            request_ttl_secs: REQUEST_TTL_SECS,
        },
        Arc::new(engine.clone()),
        oracle.clone(),
    );

    Harness {
        state,
        engine,
        signing_key,
        oracle_addr,
        oracle,
    }
}

impl Harness {
    /// Register PROVIDER as the owner would.
    pub(crate) fn with_provider(mut self) -> Self {
        self.state.add_provider(OWNER, PROVIDER).unwrap();
        self
    }

    /// A proof the dev engine will accept for this request/cleartext.
    pub(crate) fn proof_for(&self, request_id: u64, cleartext: &[u8]) -> Vec<u8> {
        self.signing_key
            .sign(&proof_message(request_id, cleartext))
            .to_bytes()
            .to_vec()
    }
}
