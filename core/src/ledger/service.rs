//! Ledger service
//!
//! Async actor wrapper around [`LedgerState`]. All commands and oracle
//! callbacks funnel through one mailbox and execute on a single task, so
//! every handler runs as an uninterrupted critical section. A periodic
//! tick runs the pending-request expiry sweep.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};

use obscura_account::Address;
use obscura_compute::OracleCallback;
use obscura_handle::CiphertextHandle;

use crate::error::LedgerError;
use crate::events::ProtocolEvent;
use crate::ledger::bridge::DecryptionContext;
use crate::ledger::state::{BatchInfo, LedgerState, LedgerStats, SubmissionReceipt};

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Messages for the ledger service
pub enum LedgerCommand {
    TransferOwnership {
        caller: Address,
        new_owner: Address,
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
    AddProvider {
        caller: Address,
        provider: Address,
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
    RemoveProvider {
        caller: Address,
        provider: Address,
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
    SetPaused {
        caller: Address,
        paused: bool,
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
    SetCooldown {
        caller: Address,
        seconds: u64,
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
    OpenBatch {
        caller: Address,
        reply: oneshot::Sender<Result<u64, LedgerError>>,
    },
    CloseBatch {
        caller: Address,
        reply: oneshot::Sender<Result<u64, LedgerError>>,
    },
    Submit {
        caller: Address,
        handle: CiphertextHandle,
        reply: oneshot::Sender<Result<SubmissionReceipt, LedgerError>>,
    },
    RequestAnalysis {
        caller: Address,
        batch_id: u64,
        index: u64,
        threshold: CiphertextHandle,
        reply: oneshot::Sender<Result<u64, LedgerError>>,
    },
    /// Oracle callback arriving over the API rather than the in-process
    /// mailbox.
    Callback {
        callback: OracleCallback,
        reply: oneshot::Sender<Result<bool, LedgerError>>,
    },
    Stats {
        reply: oneshot::Sender<LedgerStats>,
    },
    BatchInfo {
        batch_id: u64,
        reply: oneshot::Sender<Option<BatchInfo>>,
    },
    RequestContext {
        request_id: u64,
        reply: oneshot::Sender<Option<DecryptionContext>>,
    },
    Events {
        reply: oneshot::Sender<Vec<ProtocolEvent>>,
    },
    SubscribeEvents {
        reply: oneshot::Sender<broadcast::Receiver<ProtocolEvent>>,
    },
    Shutdown,
}

/// Async handle to the ledger actor.
pub struct LedgerService {
    command_tx: mpsc::Sender<LedgerCommand>,
}

impl LedgerService {
    /// Start the service loop. `callback_rx` is the mailbox the oracle
    /// delivers completions into.
    pub fn start(
        mut state: LedgerState,
        mut callback_rx: mpsc::Receiver<OracleCallback>,
        sweep_interval: Duration,
    ) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel::<LedgerCommand>(1000);

        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(sweep_interval);

            loop {
                tokio::select! {
                    Some(cmd) = command_rx.recv() => {
                        if matches!(cmd, LedgerCommand::Shutdown) {
                            break;
                        }
                        Self::handle_command(&mut state, cmd);
                    }
                    Some(cb) = callback_rx.recv() => {
                        match state.on_decryption_result(
                            cb.caller,
                            cb.request_id,
                            &cb.cleartext,
                            &cb.proof,
                        ) {
                            Ok(result) => {
                                info!("request {} finalized, result {result}", cb.request_id)
                            }
                            Err(e) => {
                                warn!("callback for request {} rejected: {e}", cb.request_id)
                            }
                        }
                    }
                    _ = sweep.tick() => {
                        state.expire_pending(unix_now());
                    }
                }
            }
            info!("ledger service stopped");
        });

        Self { command_tx }
    }

    fn handle_command(state: &mut LedgerState, cmd: LedgerCommand) {
        match cmd {
            LedgerCommand::TransferOwnership {
                caller,
                new_owner,
                reply,
            } => {
                let _ = reply.send(state.transfer_ownership(caller, new_owner));
            }
            LedgerCommand::AddProvider {
                caller,
                provider,
                reply,
            } => {
                let _ = reply.send(state.add_provider(caller, provider));
            }
            LedgerCommand::RemoveProvider {
                caller,
                provider,
                reply,
            } => {
                let _ = reply.send(state.remove_provider(caller, provider));
            }
            LedgerCommand::SetPaused {
                caller,
                paused,
                reply,
            } => {
                let _ = reply.send(state.set_paused(caller, paused));
            }
            LedgerCommand::SetCooldown {
                caller,
                seconds,
                reply,
            } => {
                let _ = reply.send(state.set_cooldown_seconds(caller, seconds));
            }
            LedgerCommand::OpenBatch { caller, reply } => {
                let _ = reply.send(state.open_new_batch(caller));
            }
            LedgerCommand::CloseBatch { caller, reply } => {
                let _ = reply.send(state.close_current_batch(caller));
            }
            LedgerCommand::Submit {
                caller,
                handle,
                reply,
            } => {
                let _ = reply.send(state.submit(caller, handle, unix_now()));
            }
            LedgerCommand::RequestAnalysis {
                caller,
                batch_id,
                index,
                threshold,
                reply,
            } => {
                let _ = reply.send(state.request_analysis(
                    caller,
                    batch_id,
                    index,
                    threshold,
                    unix_now(),
                ));
            }
            LedgerCommand::Callback { callback, reply } => {
                let _ = reply.send(state.on_decryption_result(
                    callback.caller,
                    callback.request_id,
                    &callback.cleartext,
                    &callback.proof,
                ));
            }
            LedgerCommand::Stats { reply } => {
                let _ = reply.send(state.stats());
            }
            LedgerCommand::BatchInfo { batch_id, reply } => {
                let _ = reply.send(state.batch_info(batch_id));
            }
            LedgerCommand::RequestContext { request_id, reply } => {
                let _ = reply.send(state.request_context(request_id));
            }
            LedgerCommand::Events { reply } => {
                let _ = reply.send(state.events_snapshot());
            }
            LedgerCommand::SubscribeEvents { reply } => {
                let _ = reply.send(state.subscribe_events());
            }
            LedgerCommand::Shutdown => unreachable!("handled in the loop"),
        }
    }

    async fn roundtrip<T>(
        &self,
        cmd: LedgerCommand,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T> {
        self.command_tx
            .send(cmd)
            .await
            .context("ledger service unavailable")?;
        reply_rx.await.context("ledger service crashed")
    }

    pub async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<Result<(), LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::TransferOwnership {
                caller,
                new_owner,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn add_provider(
        &self,
        caller: Address,
        provider: Address,
    ) -> Result<Result<(), LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::AddProvider {
                caller,
                provider,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn remove_provider(
        &self,
        caller: Address,
        provider: Address,
    ) -> Result<Result<(), LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::RemoveProvider {
                caller,
                provider,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn set_paused(
        &self,
        caller: Address,
        paused: bool,
    ) -> Result<Result<(), LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::SetPaused {
                caller,
                paused,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn set_cooldown(
        &self,
        caller: Address,
        seconds: u64,
    ) -> Result<Result<(), LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::SetCooldown {
                caller,
                seconds,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn open_batch(&self, caller: Address) -> Result<Result<u64, LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::OpenBatch { caller, reply }, rx).await
    }

    pub async fn close_batch(&self, caller: Address) -> Result<Result<u64, LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::CloseBatch { caller, reply }, rx).await
    }

    pub async fn submit(
        &self,
        caller: Address,
        handle: CiphertextHandle,
    ) -> Result<Result<SubmissionReceipt, LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::Submit {
                caller,
                handle,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn request_analysis(
        &self,
        caller: Address,
        batch_id: u64,
        index: u64,
        threshold: CiphertextHandle,
    ) -> Result<Result<u64, LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(
            LedgerCommand::RequestAnalysis {
                caller,
                batch_id,
                index,
                threshold,
                reply,
            },
            rx,
        )
        .await
    }

    pub async fn oracle_callback(
        &self,
        callback: OracleCallback,
    ) -> Result<Result<bool, LedgerError>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::Callback { callback, reply }, rx).await
    }

    pub async fn stats(&self) -> Result<LedgerStats> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::Stats { reply }, rx).await
    }

    pub async fn batch_info(&self, batch_id: u64) -> Result<Option<BatchInfo>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::BatchInfo { batch_id, reply }, rx).await
    }

    pub async fn request_context(&self, request_id: u64) -> Result<Option<DecryptionContext>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::RequestContext { request_id, reply }, rx)
            .await
    }

    pub async fn events(&self) -> Result<Vec<ProtocolEvent>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::Events { reply }, rx).await
    }

    pub async fn subscribe_events(&self) -> Result<broadcast::Receiver<ProtocolEvent>> {
        let (reply, rx) = oneshot::channel();
        self.roundtrip(LedgerCommand::SubscribeEvents { reply }, rx).await
    }

    /// Shutdown the service
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(LedgerCommand::Shutdown)
            .await
            .context("ledger service unavailable")?;
        Ok(())
    }
}
