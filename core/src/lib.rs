//! Obscura Core
//!
//! Confidential batch ledger: registered providers submit opaque
//! ciphertext handles into numbered batches; anyone may request a
//! homomorphic threshold comparison over a stored value; the decrypted
//! boolean arrives later through a verified oracle callback.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Obscura Ledger                              │
//! │                                                                  │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  HTTP API   │  │ LedgerService│  │  Dev Engine / Oracle   │  │
//! │  │  (axum)     │  │  (actor)     │  │  (compute seams)       │  │
//! │  └──────┬──────┘  └──────┬───────┘  └───────────┬────────────┘  │
//! │         │                │                      │               │
//! │         ▼                ▼                      ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                     LedgerState                          │   │
//! │  │  • AccessControl (owner, providers, pause)               │   │
//! │  │  • RateLimiter (submission + analysis clocks)            │   │
//! │  │  • BatchLedger / EncryptedStore                          │   │
//! │  │  • OracleBridge (pending decryption contexts)            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A deliberate consistency rule worth knowing up front: a decryption
//! result can never be finalized once its originating batch has been
//! closed, even when the homomorphic computation already succeeded. The
//! callback is rejected and the computed result discarded.

pub mod api;
pub mod error;
pub mod events;
pub mod ledger;
