use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// A 32-byte protocol identity: owners, providers, analysts and the
/// trusted oracle are all addressed this way.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex::serde")] pub [u8; 32]);

#[derive(Debug, Error, PartialEq)]
pub enum AddressParseError {
    #[error("invalid address encoding")]
    InvalidEncoding,
    #[error("invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl Address {
    /// Derive an address from an Ed25519 public key.
    /// Formula: SHA256( pubkey_bytes )
    pub fn from_pubkey(pubkey: &[u8; 32]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(pubkey);
        Address(hasher.finalize().into())
    }

    /// Derive a deterministic address from an arbitrary label.
    /// Used for dev-mode identities and instance tags.
    pub fn derive(label: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(label);
        Address(hasher.finalize().into())
    }

    /// Parse from a hex string (with or without `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| AddressParseError::InvalidEncoding)?;
        if bytes.len() != 32 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Address(arr))
    }

    /// Returns the address as Base58
    pub fn as_bs58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_bs58())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressParseError;

    /// Accepts Base58 or hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(bytes) = bs58::decode(s).into_vec() {
            if bytes.len() == 32 {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&bytes);
                return Ok(Address(arr));
            }
        }
        Self::from_hex(s)
    }
}
