//! API Types
//!
//! Request/response types for the HTTP API. Addresses are hex or Base58
//! strings; ciphertext handles, cleartexts and proofs are hex.

use serde::{Deserialize, Serialize};

use crate::ledger::DecryptionContext;

// ============================================================================
// Administration
// ============================================================================

/// Owner call transferring ownership
#[derive(Debug, Deserialize)]
pub struct TransferOwnershipRequest {
    pub caller: String,
    pub new_owner: String,
}

/// Owner call adding or removing a provider
#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub caller: String,
    pub provider: String,
}

/// Owner call toggling the pause flag
#[derive(Debug, Deserialize)]
pub struct SetPausedRequest {
    pub caller: String,
    pub paused: bool,
}

/// Owner call changing the cooldown
#[derive(Debug, Deserialize)]
pub struct SetCooldownRequest {
    pub caller: String,
    pub seconds: u64,
}

/// Generic acknowledgement for administrative calls
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub accepted: bool,
}

// ============================================================================
// Batch Lifecycle
// ============================================================================

/// Owner call opening or closing a batch
#[derive(Debug, Deserialize)]
pub struct BatchLifecycleRequest {
    pub caller: String,
}

#[derive(Debug, Serialize)]
pub struct BatchLifecycleResponse {
    pub batch_id: u64,
}

// ============================================================================
// Submission & Analysis
// ============================================================================

/// Provider submission of a ciphertext handle
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub caller: String,
    /// Ciphertext handle bytes, hex encoded
    pub handle: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub batch_id: u64,
    pub index: u64,
}

/// Threshold-comparison request against a stored record
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub caller: String,
    pub batch_id: u64,
    pub index: u64,
    /// Threshold handle bytes, hex encoded
    pub threshold: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub request_id: u64,
}

// ============================================================================
// Oracle Callback
// ============================================================================

/// Decryption result delivered by the oracle
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub caller: String,
    pub request_id: u64,
    /// Decrypted bytes, hex encoded
    pub cleartext: String,
    /// Decryption proof, hex encoded
    pub proof: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub request_id: u64,
    pub result: bool,
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
}

/// Decryption request status
#[derive(Debug, Serialize)]
pub struct RequestContextResponse {
    pub request_id: u64,
    #[serde(flatten)]
    pub context: DecryptionContext,
}

// ============================================================================
// Dev Mode
// ============================================================================

/// Seal a plaintext value with the dev engine (dev mode only)
#[derive(Debug, Deserialize)]
pub struct DevSealRequest {
    pub value: u64,
}

#[derive(Debug, Serialize)]
pub struct DevSealResponse {
    /// Ciphertext handle bytes, hex encoded
    pub handle: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(msg, "INTERNAL_ERROR")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND")
    }
}
