//! Obscura Compute Collaborators
//!
//! The ledger core delegates everything cryptographic to two external
//! collaborators, reached through the traits in this crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Analysis Request Flow                        │
//! │                                                              │
//! │  Ledger ──ge(stored, threshold)──▶ ThresholdEngine           │
//! │    │            (new result handle)                          │
//! │    └──request_decryption(handle)──▶ DecryptionOracle         │
//! │                                        │  (later)            │
//! │  Ledger ◀──callback(cleartext, proof)──┘                     │
//! │    └──verify_decryption_proof──▶ ThresholdEngine             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `DevEngine` and `DevOracle` are in-process stand-ins for dev mode and
//! tests; production deployments wire real services behind the same
//! traits.

pub mod engine;
pub mod oracle;

pub use engine::{
    ComputeError, DevEngine, ThresholdEngine, decode_bool, encode_bool, proof_message,
};
pub use oracle::{DecryptionOracle, DevOracle, OracleCallback, dev_pair};
