//! Oracle bridge state
//!
//! Pending-request table keyed by the oracle-issued request id. Each
//! context binds the originating batch and a state hash of the handle
//! sent for decryption; the callback must re-derive the same hash or it
//! is rejected. Contexts are retained forever as audit records — expiry
//! and processing change status, never delete.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use obscura_handle::StateHash;

use crate::error::LedgerError;

/// Lifecycle of a decryption request.
///
/// A rejected callback does not change status: the context stays
/// `Pending` and a corrected callback may later succeed. The terminal
/// states are `Processed` (success), `Expired` (TTL sweep), and —
/// implicitly — a pending context whose batch has closed, which can
/// never be finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub batch_id: u64,
    pub state_hash: StateHash,
    pub status: RequestStatus,
    pub requested_at: u64,
    pub expires_at: u64,
}

impl DecryptionContext {
    pub fn is_processed(&self) -> bool {
        self.status == RequestStatus::Processed
    }
}

#[derive(Default)]
pub struct OracleBridge {
    contexts: HashMap<u64, DecryptionContext>,
}

impl OracleBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly dispatched request. Request ids are issued by
    /// the oracle and must be unique.
    pub fn insert(
        &mut self,
        request_id: u64,
        context: DecryptionContext,
    ) -> Result<(), LedgerError> {
        if self.contexts.contains_key(&request_id) {
            return Err(obscura_compute::ComputeError::DuplicateRequestId(request_id).into());
        }
        self.contexts.insert(request_id, context);
        Ok(())
    }

    pub fn get(&self, request_id: u64) -> Option<&DecryptionContext> {
        self.contexts.get(&request_id)
    }

    /// One-way flip to `Processed`. Caller must have verified the
    /// context is pending.
    pub fn mark_processed(&mut self, request_id: u64) {
        if let Some(ctx) = self.contexts.get_mut(&request_id) {
            debug_assert_eq!(ctx.status, RequestStatus::Pending);
            ctx.status = RequestStatus::Processed;
        }
    }

    /// Move every overdue pending context to `Expired`. Returns the
    /// affected (request id, batch id) pairs for event emission.
    pub fn expire_due(&mut self, now: u64) -> Vec<(u64, u64)> {
        let mut expired = Vec::new();
        for (&request_id, ctx) in self.contexts.iter_mut() {
            if ctx.status == RequestStatus::Pending && ctx.expires_at <= now {
                ctx.status = RequestStatus::Expired;
                expired.push((request_id, ctx.batch_id));
            }
        }
        // Deterministic event order regardless of map iteration.
        expired.sort_unstable();
        expired
    }

    pub fn count_with_status(&self, status: RequestStatus) -> usize {
        self.contexts
            .values()
            .filter(|ctx| ctx.status == status)
            .count()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
