//! Decryption oracle seam
//!
//! The oracle accepts a ciphertext handle and later delivers the
//! cleartext plus a signed proof through a callback channel. The ledger
//! never waits on it; requests stay pending until the callback lands.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chacha20poly1305::aead::rand_core::{OsRng, RngCore};
use ed25519_dalek::{Signer, SigningKey};
use log::debug;
use tokio::sync::mpsc;

use obscura_account::Address;
use obscura_handle::CiphertextHandle;

use crate::engine::{ComputeError, DevEngine, encode_bool, proof_message};

/// The decryption-oracle collaborator. Dispatch returns the oracle-issued
/// request id; the result arrives later as an [`OracleCallback`].
pub trait DecryptionOracle: Send + Sync {
    fn request_decryption(&self, handle: CiphertextHandle) -> Result<u64, ComputeError>;
}

/// Asynchronous completion of a decryption request.
#[derive(Debug, Clone)]
pub struct OracleCallback {
    /// Identity the callback arrives under. The ledger only trusts its
    /// configured oracle address.
    pub caller: Address,
    pub request_id: u64,
    pub cleartext: Vec<u8>,
    pub proof: Vec<u8>,
}

/// In-process oracle for dev mode and tests.
///
/// Decrypts with a [`DevEngine`] clone, signs `(request id ‖ cleartext)`
/// with its Ed25519 key, and posts the callback onto the ledger's
/// callback mailbox after a configurable delay.
pub struct DevOracle {
    engine: DevEngine,
    signing_key: SigningKey,
    address: Address,
    next_id: AtomicU64,
    callback_tx: mpsc::Sender<OracleCallback>,
    delay: Duration,
}

impl DevOracle {
    pub fn new(
        engine: DevEngine,
        signing_key: SigningKey,
        callback_tx: mpsc::Sender<OracleCallback>,
        delay: Duration,
    ) -> Self {
        let address = Address::from_pubkey(signing_key.verifying_key().as_bytes());
        Self {
            engine,
            signing_key,
            address,
            next_id: AtomicU64::new(1),
            callback_tx,
            delay,
        }
    }

    /// The identity this oracle's callbacks arrive under.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a decryption result the way the callback task does.
    pub fn sign_result(&self, request_id: u64, cleartext: &[u8]) -> Vec<u8> {
        self.signing_key
            .sign(&proof_message(request_id, cleartext))
            .to_bytes()
            .to_vec()
    }
}

impl DecryptionOracle for DevOracle {
    fn request_decryption(&self, handle: CiphertextHandle) -> Result<u64, ComputeError> {
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        // Decrypt eagerly so a handle this oracle cannot open fails the
        // request itself rather than a callback that never comes.
        let value = self.engine.open_bool(&handle)?;

        let cleartext = encode_bool(value);
        let proof = self.sign_result(request_id, &cleartext);
        let callback = OracleCallback {
            caller: self.address,
            request_id,
            cleartext,
            proof,
        };

        let tx = self.callback_tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("dev oracle delivering callback for request {request_id}");
            let _ = tx.send(callback).await;
        });

        Ok(request_id)
    }
}

/// Generate a fresh engine/oracle pair sharing one sealing key, wired to
/// the given callback mailbox.
pub fn dev_pair(
    callback_tx: mpsc::Sender<OracleCallback>,
    delay: Duration,
) -> (DevEngine, Arc<DevOracle>) {
    let mut engine_key = [0u8; 32];
    OsRng.fill_bytes(&mut engine_key);
    let mut sk_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut sk_bytes);

    let signing_key = SigningKey::from_bytes(&sk_bytes);
    let engine = DevEngine::new(engine_key, signing_key.verifying_key());
    let oracle = Arc::new(DevOracle::new(engine.clone(), signing_key, callback_tx, delay));

    (engine, oracle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ThresholdEngine;

    #[tokio::test]
    async fn test_dev_oracle_delivers_verifiable_callback() {
        let (tx, mut rx) = mpsc::channel(8);
        let (engine, oracle) = dev_pair(tx, Duration::from_millis(0));

        let handle = engine.trivial_bool(true);
        let request_id = oracle.request_decryption(handle).unwrap();
        assert_eq!(request_id, 1);

        let callback = rx.recv().await.expect("callback should arrive");
        assert_eq!(callback.request_id, 1);
        assert_eq!(callback.caller, oracle.address());
        assert_eq!(callback.cleartext, encode_bool(true));
        assert!(engine.verify_decryption_proof(1, &callback.cleartext, &callback.proof));
    }

    #[tokio::test]
    async fn test_dev_oracle_rejects_foreign_handle() {
        let (tx, _rx) = mpsc::channel(8);
        let (_engine, oracle) = dev_pair(tx, Duration::from_millis(0));

        let foreign = CiphertextHandle::new(vec![0u8; 32]);
        assert!(oracle.request_decryption(foreign).is_err());
    }

    #[tokio::test]
    async fn test_request_ids_are_sequential() {
        let (tx, mut rx) = mpsc::channel(8);
        let (engine, oracle) = dev_pair(tx, Duration::from_millis(0));

        let a = oracle.request_decryption(engine.trivial_bool(false)).unwrap();
        let b = oracle.request_decryption(engine.trivial_bool(true)).unwrap();
        assert_eq!((a, b), (1, 2));

        // Both callbacks land regardless of order.
        let mut seen = vec![
            rx.recv().await.unwrap().request_id,
            rx.recv().await.unwrap().request_id,
        ];
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    }
}
