//! Ledger error taxonomy
//!
//! Every protocol operation front-loads its checks: a failure here means
//! nothing was mutated. Errors are classified by [`ErrorKind`] so the
//! HTTP layer can map them to status codes without matching every
//! variant.

use obscura_account::Address;
use obscura_compute::ComputeError;
use thiserror::Error;

/// Coarse classification of a ledger failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the owner / provider / oracle capability
    Authorization,
    /// System paused or a collaborator is unreachable
    Availability,
    /// Cooldown not elapsed
    RateLimit,
    /// Unknown or closed batch, out-of-range index, expired request
    State,
    /// Replay, state-hash mismatch, or bad proof at callback time
    Integrity,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not a registered provider")]
    NotProvider { caller: Address },

    #[error("caller {caller} is not the trusted oracle")]
    NotOracle { caller: Address },

    #[error("submissions are paused")]
    Paused,

    #[error("cooldown active, {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("unknown batch {batch_id}")]
    UnknownBatch { batch_id: u64 },

    #[error("batch {batch_id} is closed")]
    BatchClosed { batch_id: u64 },

    #[error("index {index} out of range for batch {batch_id} ({count} submissions)")]
    IndexOutOfRange {
        batch_id: u64,
        index: u64,
        count: u64,
    },

    #[error("unknown decryption request {request_id}")]
    UnknownRequest { request_id: u64 },

    #[error("decryption request {request_id} already processed")]
    ReplayAttempt { request_id: u64 },

    #[error("decryption request {request_id} has expired")]
    RequestExpired { request_id: u64 },

    #[error("state hash mismatch for request {request_id}")]
    StateMismatch { request_id: u64 },

    #[error("invalid decryption proof for request {request_id}")]
    InvalidProof { request_id: u64 },

    #[error("compute collaborator failure: {0}")]
    Compute(#[from] ComputeError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotOwner { .. }
            | LedgerError::NotProvider { .. }
            | LedgerError::NotOracle { .. } => ErrorKind::Authorization,
            LedgerError::Paused | LedgerError::Compute(_) => ErrorKind::Availability,
            LedgerError::CooldownActive { .. } => ErrorKind::RateLimit,
            LedgerError::UnknownBatch { .. }
            | LedgerError::BatchClosed { .. }
            | LedgerError::IndexOutOfRange { .. }
            | LedgerError::RequestExpired { .. } => ErrorKind::State,
            LedgerError::UnknownRequest { .. }
            | LedgerError::ReplayAttempt { .. }
            | LedgerError::StateMismatch { .. }
            | LedgerError::InvalidProof { .. } => ErrorKind::Integrity,
        }
    }
}
