//! Ledger state and command handlers
//!
//! `LedgerState` owns every registry in the protocol and is the single
//! place state changes happen. Each operation is a command handler that
//! front-loads all of its checks and only then mutates — a failing check
//! leaves the ledger exactly as it was. The service actor serializes
//! access, so handlers never interleave.

use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use obscura_account::Address;
use obscura_compute::{DecryptionOracle, ThresholdEngine, decode_bool};
use obscura_handle::{CiphertextHandle, state_hash};

use crate::error::LedgerError;
use crate::events::{EventLog, ProtocolEvent};
use crate::ledger::access::AccessControl;
use crate::ledger::batch::{BatchLedger, BatchMeta};
use crate::ledger::bridge::{DecryptionContext, OracleBridge, RequestStatus};
use crate::ledger::ratelimit::{CooldownKind, RateLimiter};
use crate::ledger::store::EncryptedStore;

/// Construction-time ledger parameters.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Initial owner
    pub owner: Address,
    /// Instance identity folded into every state hash
    pub instance: Address,
    /// Only callbacks arriving under this identity are trusted
    pub trusted_oracle: Address,
    /// Cooldown between consecutive actions per address
    pub cooldown_secs: u64,
    /// Pending decryption request lifetime
    pub request_ttl_secs: u64,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub batch_id: u64,
    pub index: u64,
}

/// Read-only batch view for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInfo {
    pub batch_id: u64,
    pub closed: bool,
    pub submissions: u64,
}

/// Ledger-wide counters for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub current_batch_id: u64,
    pub current_batch_closed: bool,
    pub current_batch_submissions: u64,
    pub total_records: usize,
    pub providers: usize,
    pub paused: bool,
    pub cooldown_secs: u64,
    pub pending_requests: usize,
    pub processed_requests: usize,
    pub expired_requests: usize,
    pub events: usize,
}

pub struct LedgerState {
    instance: Address,
    trusted_oracle: Address,
    request_ttl_secs: u64,
    access: AccessControl,
    limiter: RateLimiter,
    batches: BatchLedger,
    store: EncryptedStore,
    bridge: OracleBridge,
    events: EventLog,
    engine: Arc<dyn ThresholdEngine>,
    oracle: Arc<dyn DecryptionOracle>,
}

impl LedgerState {
    /// Create a ledger with batch 1 open.
    pub fn new(
        config: LedgerConfig,
        engine: Arc<dyn ThresholdEngine>,
        oracle: Arc<dyn DecryptionOracle>,
    ) -> Self {
        let mut state = Self {
            instance: config.instance,
            trusted_oracle: config.trusted_oracle,
            request_ttl_secs: config.request_ttl_secs,
            access: AccessControl::new(config.owner, config.cooldown_secs),
            limiter: RateLimiter::new(),
            batches: BatchLedger::new(),
            store: EncryptedStore::new(),
            bridge: OracleBridge::new(),
            events: EventLog::new(),
            engine,
            oracle,
        };
        state
            .events
            .emit(ProtocolEvent::BatchOpened { batch_id: 1 });
        state
    }

    // ------------------------------------------------------------------
    // Administration (owner-gated)
    // ------------------------------------------------------------------

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        let previous = self.access.set_owner(new_owner);
        self.events
            .emit(ProtocolEvent::OwnershipTransferred { previous, new_owner });
        info!("ownership transferred from {previous} to {new_owner}");
        Ok(())
    }

    pub fn add_provider(&mut self, caller: Address, provider: Address) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        if self.access.add_provider(provider) {
            self.events.emit(ProtocolEvent::ProviderAdded { provider });
            info!("provider {provider} registered");
        } else {
            debug!("provider {provider} already registered, no-op");
        }
        Ok(())
    }

    pub fn remove_provider(
        &mut self,
        caller: Address,
        provider: Address,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        if self.access.remove_provider(&provider) {
            self.events.emit(ProtocolEvent::ProviderRemoved { provider });
            info!("provider {provider} removed");
        } else {
            debug!("provider {provider} not registered, no-op");
        }
        Ok(())
    }

    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.access.set_paused(paused);
        self.events.emit(ProtocolEvent::PauseToggled { paused });
        info!("pause flag set to {paused}");
        Ok(())
    }

    pub fn set_cooldown_seconds(
        &mut self,
        caller: Address,
        seconds: u64,
    ) -> Result<(), LedgerError> {
        self.access.require_owner(caller)?;
        self.access.set_cooldown_secs(seconds);
        self.events
            .emit(ProtocolEvent::CooldownSecondsSet { seconds });
        info!("cooldown set to {seconds}s");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Batch lifecycle (owner-gated)
    // ------------------------------------------------------------------

    pub fn open_new_batch(&mut self, caller: Address) -> Result<u64, LedgerError> {
        self.access.require_owner(caller)?;
        let batch_id = self.batches.open_new();
        self.events.emit(ProtocolEvent::BatchOpened { batch_id });
        info!("batch {batch_id} opened");
        Ok(batch_id)
    }

    pub fn close_current_batch(&mut self, caller: Address) -> Result<u64, LedgerError> {
        self.access.require_owner(caller)?;
        let batch_id = self.batches.close_current()?;
        self.events.emit(ProtocolEvent::BatchClosed { batch_id });
        info!("batch {batch_id} closed");
        Ok(batch_id)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Provider submission into the current batch. Checks run in a fixed
    /// order — provider, pause, cooldown, batch — and nothing mutates
    /// until all pass.
    pub fn submit(
        &mut self,
        caller: Address,
        handle: CiphertextHandle,
        now: u64,
    ) -> Result<SubmissionReceipt, LedgerError> {
        self.access.require_provider(caller)?;
        self.access.require_not_paused()?;
        self.limiter.require_clear(
            CooldownKind::Submission,
            &caller,
            now,
            self.access.cooldown_secs(),
        )?;
        let batch_id = self.batches.current_id();
        self.batches.require_open(batch_id)?;

        self.limiter.record(CooldownKind::Submission, caller, now);
        let index = self.batches.assign_index();
        self.store.insert(batch_id, index, handle);
        self.events.emit(ProtocolEvent::DataSubmitted {
            provider: caller,
            batch_id,
            index,
        });
        debug!("submission stored at batch {batch_id} index {index} from {caller}");
        Ok(SubmissionReceipt { batch_id, index })
    }

    // ------------------------------------------------------------------
    // Analysis request / oracle callback
    // ------------------------------------------------------------------

    /// Ask for `stored >= threshold` on a stored record. Open to any
    /// caller, throttled on the analysis clock. Dispatches the result
    /// handle to the oracle and registers a pending context under the
    /// oracle-issued request id.
    pub fn request_analysis(
        &mut self,
        caller: Address,
        batch_id: u64,
        index: u64,
        threshold: CiphertextHandle,
        now: u64,
    ) -> Result<u64, LedgerError> {
        self.limiter.require_clear(
            CooldownKind::Analysis,
            &caller,
            now,
            self.access.cooldown_secs(),
        )?;
        self.batches.require_open(batch_id)?;
        self.batches.require_index(batch_id, index)?;

        let stored = self
            .store
            .get(batch_id, index)
            .expect("record exists for every assigned index");
        let result = self.engine.ge(stored, &threshold)?;
        let bound_hash = state_hash(&self.instance, &[&result]);
        let request_id = self.oracle.request_decryption(result)?;

        self.bridge.insert(
            request_id,
            DecryptionContext {
                batch_id,
                state_hash: bound_hash,
                status: RequestStatus::Pending,
                requested_at: now,
                expires_at: now + self.request_ttl_secs,
            },
        )?;
        self.limiter.record(CooldownKind::Analysis, caller, now);
        self.events
            .emit(ProtocolEvent::DecryptionRequested { request_id, batch_id });
        info!("decryption request {request_id} dispatched for batch {batch_id} index {index}");
        Ok(request_id)
    }

    /// Asynchronous completion of a decryption request.
    ///
    /// Validation order: trusted caller, replay/unknown, expiry, batch
    /// still open, state-hash binding, proof. A rejection at any step
    /// leaves the context pending (retryable) — except the batch-closed
    /// and expired cases, which can never subsequently succeed. Note the
    /// batch-close rule discards results whose computation already
    /// finished; that is the intended consistency rule, not an accident.
    pub fn on_decryption_result(
        &mut self,
        caller: Address,
        request_id: u64,
        cleartext: &[u8],
        proof: &[u8],
    ) -> Result<bool, LedgerError> {
        if caller != self.trusted_oracle {
            return Err(LedgerError::NotOracle { caller });
        }

        let (batch_id, bound_hash, status) = match self.bridge.get(request_id) {
            Some(ctx) => (ctx.batch_id, ctx.state_hash, ctx.status),
            None => return Err(LedgerError::UnknownRequest { request_id }),
        };
        match status {
            RequestStatus::Processed => return Err(LedgerError::ReplayAttempt { request_id }),
            RequestStatus::Expired => return Err(LedgerError::RequestExpired { request_id }),
            RequestStatus::Pending => {}
        }

        let closed = self
            .batches
            .meta(batch_id)
            .map(|meta| meta.closed)
            .unwrap_or(true);
        if closed {
            return Err(LedgerError::BatchClosed { batch_id });
        }

        // A cleartext the engine cannot re-derive can never match the
        // bound hash; treat it as the same integrity failure.
        let derived = self
            .engine
            .reencrypt(cleartext)
            .map_err(|_| LedgerError::StateMismatch { request_id })?;
        if state_hash(&self.instance, &[&derived]) != bound_hash {
            return Err(LedgerError::StateMismatch { request_id });
        }

        if !self
            .engine
            .verify_decryption_proof(request_id, cleartext, proof)
        {
            return Err(LedgerError::InvalidProof { request_id });
        }

        let result = decode_bool(cleartext).map_err(|_| LedgerError::StateMismatch { request_id })?;
        self.bridge.mark_processed(request_id);
        self.events.emit(ProtocolEvent::DecryptionCompleted {
            request_id,
            batch_id,
            result,
        });
        info!("decryption request {request_id} completed, result {result}");
        Ok(result)
    }

    /// Move overdue pending requests to `Expired`. Returns how many.
    pub fn expire_pending(&mut self, now: u64) -> usize {
        let expired = self.bridge.expire_due(now);
        for &(request_id, batch_id) in &expired {
            self.events
                .emit(ProtocolEvent::DecryptionExpired { request_id, batch_id });
        }
        if !expired.is_empty() {
            info!("expired {} pending decryption requests", expired.len());
        }
        expired.len()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn instance(&self) -> Address {
        self.instance
    }

    pub fn is_provider(&self, addr: &Address) -> bool {
        self.access.is_provider(addr)
    }

    pub fn batch_info(&self, batch_id: u64) -> Option<BatchInfo> {
        self.batches.meta(batch_id).map(|meta: &BatchMeta| BatchInfo {
            batch_id,
            closed: meta.closed,
            submissions: meta.submissions,
        })
    }

    pub fn request_context(&self, request_id: u64) -> Option<DecryptionContext> {
        self.bridge.get(request_id).cloned()
    }

    pub fn events_snapshot(&self) -> Vec<ProtocolEvent> {
        self.events.all().to_vec()
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ProtocolEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> LedgerStats {
        let current = self.batches.current_id();
        let meta = self.batches.meta(current);
        LedgerStats {
            current_batch_id: current,
            current_batch_closed: meta.map(|m| m.closed).unwrap_or(false),
            current_batch_submissions: meta.map(|m| m.submissions).unwrap_or(0),
            total_records: self.store.len(),
            providers: self.access.provider_count(),
            paused: self.access.paused(),
            cooldown_secs: self.access.cooldown_secs(),
            pending_requests: self.bridge.count_with_status(RequestStatus::Pending),
            processed_requests: self.bridge.count_with_status(RequestStatus::Processed),
            expired_requests: self.bridge.count_with_status(RequestStatus::Expired),
            events: self.events.len(),
        }
    }
}
