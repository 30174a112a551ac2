//! Ciphertext handles
//!
//! The core protocol never looks inside an encrypted value. It moves
//! [`CiphertextHandle`]s around: version-tagged byte strings that only the
//! homomorphic-compute engine can operate on. The one thing the protocol
//! does with a handle is bind it: a [`StateHash`] is a domain-separated
//! digest over handle bytes plus the ledger instance identity, computed
//! when a decryption request is dispatched and recomputed when the oracle
//! calls back. A callback whose payload does not re-derive to the same
//! hash is rejected.

use obscura_account::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle format version tag.
pub const HANDLE_VERSION_V1: u8 = 1;

/// Domain separation for state hashes. The instance address is hashed in
/// right after this tag, so two ledger instances can never replay each
/// other's callbacks.
const STATE_HASH_DOMAIN: &[u8] = b"obscura-state-v1";

#[derive(Debug, Error, PartialEq)]
pub enum HandleError {
    #[error("unsupported handle version {0}")]
    UnsupportedVersion(u8),
    #[error("empty handle")]
    Empty,
}

/// An opaque reference to an encrypted value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle {
    version: u8,
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl CiphertextHandle {
    /// Wrap engine-produced bytes in a v1 handle.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            version: HANDLE_VERSION_V1,
            bytes,
        }
    }

    /// Rebuild a handle from its parts, validating the version tag.
    pub fn from_parts(version: u8, bytes: Vec<u8>) -> Result<Self, HandleError> {
        if version != HANDLE_VERSION_V1 {
            return Err(HandleError::UnsupportedVersion(version));
        }
        if bytes.is_empty() {
            return Err(HandleError::Empty);
        }
        Ok(Self { version, bytes })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl std::fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Handles can be large; show a prefix only.
        let head: String = self.to_hex().chars().take(16).collect();
        write!(f, "CiphertextHandle(v{}, {}..)", self.version, head)
    }
}

/// Digest binding a decryption request to its eventual callback.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StateHash(#[serde(with = "hex::serde")] pub [u8; 32]);

impl StateHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Compute the state hash over a set of handles for one ledger instance.
///
/// Handle bytes are length-prefixed so two handle lists can never collide
/// by shifting bytes across a boundary.
pub fn state_hash(instance: &Address, handles: &[&CiphertextHandle]) -> StateHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(STATE_HASH_DOMAIN);
    hasher.update(&instance.0);
    for handle in handles {
        hasher.update(&(handle.bytes.len() as u64).to_le_bytes());
        hasher.update(&[handle.version]);
        hasher.update(&handle.bytes);
    }
    StateHash(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_rejects_unknown_version() {
        assert_eq!(
            CiphertextHandle::from_parts(9, vec![1, 2, 3]),
            Err(HandleError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_from_parts_rejects_empty() {
        assert_eq!(
            CiphertextHandle::from_parts(HANDLE_VERSION_V1, vec![]),
            Err(HandleError::Empty)
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let handle = CiphertextHandle::new(vec![0xAB; 40]);
        let json = serde_json::to_string(&handle).unwrap();
        let back: CiphertextHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(handle, back);
    }
}
