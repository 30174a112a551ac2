//! Homomorphic-compute engine seam
//!
//! The protocol only ever asks the engine three things: compare two
//! sealed values, re-derive a result handle from callback cleartext, and
//! check a decryption proof. `DevEngine` answers all three in-process by
//! holding the sealing key itself, which is exactly what a confidential
//! compute engine is trusted to do off-process.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use chacha20poly1305::aead::rand_core::{OsRng, RngCore};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

use obscura_handle::CiphertextHandle;

const SEALED_U64_AAD: &[u8] = b"obscura-sealed-u64-v1";
const TRIVIAL_BOOL_DOMAIN: &[u8] = b"obscura-ebool-v1";
const PROOF_DOMAIN: &[u8] = b"obscura-proof-v1";

const NONCE_LEN: usize = 12;

/// Collaborator errors
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("malformed ciphertext handle")]
    MalformedHandle,
    #[error("malformed cleartext")]
    MalformedCleartext,
    #[error("oracle returned duplicate request id {0}")]
    DuplicateRequestId(u64),
    #[error("decryption oracle unavailable")]
    OracleUnavailable,
}

/// The homomorphic-compute collaborator.
///
/// Implementations own the meaning of handle bytes; the ledger treats
/// them as opaque.
pub trait ThresholdEngine: Send + Sync {
    /// Homomorphic `lhs >= rhs` over two sealed values. Returns the
    /// result as a new ciphertext handle.
    fn ge(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, ComputeError>;

    /// Re-derive the result handle a decryption cleartext corresponds to.
    /// Must agree with what [`ThresholdEngine::ge`] produced for the same
    /// boolean, or the ledger's state-hash check can never pass.
    fn reencrypt(&self, cleartext: &[u8]) -> Result<CiphertextHandle, ComputeError>;

    /// Check the oracle's proof that `cleartext` was honestly derived for
    /// `request_id`.
    fn verify_decryption_proof(&self, request_id: u64, cleartext: &[u8], proof: &[u8]) -> bool;
}

/// Wire encoding of a decrypted boolean: a single byte, 0 or 1.
pub fn encode_bool(value: bool) -> Vec<u8> {
    vec![value as u8]
}

/// Decode a decrypted boolean, rejecting anything but the two valid
/// one-byte encodings.
pub fn decode_bool(cleartext: &[u8]) -> Result<bool, ComputeError> {
    match cleartext {
        [0] => Ok(false),
        [1] => Ok(true),
        _ => Err(ComputeError::MalformedCleartext),
    }
}

/// Message a decryption proof signs: domain tag, request id, cleartext.
pub fn proof_message(request_id: u64, cleartext: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(PROOF_DOMAIN.len() + 8 + cleartext.len());
    msg.extend_from_slice(PROOF_DOMAIN);
    msg.extend_from_slice(&request_id.to_le_bytes());
    msg.extend_from_slice(cleartext);
    msg
}

/// In-process engine for dev mode and tests.
///
/// Seals u64 values under a ChaCha20-Poly1305 key it holds directly and
/// verifies oracle proofs against a configured Ed25519 key. Result
/// handles for booleans are derived deterministically from the engine key
/// and the value, so `reencrypt` agrees with `ge` by construction.
#[derive(Clone)]
pub struct DevEngine {
    key: [u8; 32],
    oracle_vk: VerifyingKey,
}

impl DevEngine {
    pub fn new(key: [u8; 32], oracle_vk: VerifyingKey) -> Self {
        Self { key, oracle_vk }
    }

    /// Seal a u64 into a ciphertext handle. Nonce is random, so equal
    /// values produce distinct handles.
    pub fn seal_value(&self, value: u64) -> Result<CiphertextHandle, ComputeError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|_| ComputeError::EncryptionFailed)?;
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: &value.to_le_bytes(),
                    aad: SEALED_U64_AAD,
                },
            )
            .map_err(|_| ComputeError::EncryptionFailed)?;

        let mut bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        bytes.extend_from_slice(&nonce_bytes);
        bytes.extend_from_slice(&ciphertext);
        Ok(CiphertextHandle::new(bytes))
    }

    /// Open a sealed u64.
    pub fn open_value(&self, handle: &CiphertextHandle) -> Result<u64, ComputeError> {
        let bytes = handle.as_bytes();
        if bytes.len() <= NONCE_LEN {
            return Err(ComputeError::MalformedHandle);
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|_| ComputeError::DecryptionFailed)?;
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: SEALED_U64_AAD,
                },
            )
            .map_err(|_| ComputeError::DecryptionFailed)?;

        let arr: [u8; 8] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| ComputeError::MalformedHandle)?;
        Ok(u64::from_le_bytes(arr))
    }

    /// Deterministic handle for an encrypted boolean.
    pub fn trivial_bool(&self, value: bool) -> CiphertextHandle {
        let mut hasher = blake3::Hasher::new();
        hasher.update(TRIVIAL_BOOL_DOMAIN);
        hasher.update(&self.key);
        hasher.update(&[value as u8]);
        CiphertextHandle::new(hasher.finalize().as_bytes().to_vec())
    }

    /// Recover the boolean behind a trivial handle. Only the two valid
    /// handles exist per engine key, so matching is exact.
    pub fn open_bool(&self, handle: &CiphertextHandle) -> Result<bool, ComputeError> {
        if *handle == self.trivial_bool(false) {
            Ok(false)
        } else if *handle == self.trivial_bool(true) {
            Ok(true)
        } else {
            Err(ComputeError::MalformedHandle)
        }
    }
}

impl ThresholdEngine for DevEngine {
    fn ge(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, ComputeError> {
        let lhs = self.open_value(lhs)?;
        let rhs = self.open_value(rhs)?;
        Ok(self.trivial_bool(lhs >= rhs))
    }

    fn reencrypt(&self, cleartext: &[u8]) -> Result<CiphertextHandle, ComputeError> {
        Ok(self.trivial_bool(decode_bool(cleartext)?))
    }

    fn verify_decryption_proof(&self, request_id: u64, cleartext: &[u8], proof: &[u8]) -> bool {
        let Ok(sig) = Signature::from_slice(proof) else {
            return false;
        };
        self.oracle_vk
            .verify(&proof_message(request_id, cleartext), &sig)
            .is_ok()
    }
}
