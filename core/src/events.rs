//! Protocol events
//!
//! Events are the durable audit trail and the only channel through which
//! external observers learn outcomes. Every event is retained in-order
//! for the life of the process and fanned out live over a broadcast
//! channel for subscribers (API event streams, tests).

use obscura_account::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Broadcast channel capacity; slow subscribers lag rather than block
/// the ledger.
const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
    },
    ProviderAdded {
        provider: Address,
    },
    ProviderRemoved {
        provider: Address,
    },
    PauseToggled {
        paused: bool,
    },
    CooldownSecondsSet {
        seconds: u64,
    },
    BatchOpened {
        batch_id: u64,
    },
    BatchClosed {
        batch_id: u64,
    },
    DataSubmitted {
        provider: Address,
        batch_id: u64,
        index: u64,
    },
    DecryptionRequested {
        request_id: u64,
        batch_id: u64,
    },
    DecryptionCompleted {
        request_id: u64,
        batch_id: u64,
        result: bool,
    },
    DecryptionExpired {
        request_id: u64,
        batch_id: u64,
    },
}

/// Retained event log with live fan-out.
pub struct EventLog {
    log: Vec<ProtocolEvent>,
    tx: broadcast::Sender<ProtocolEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { log: Vec::new(), tx }
    }

    /// Append an event and notify subscribers. No subscribers is fine.
    pub fn emit(&mut self, event: ProtocolEvent) {
        self.log.push(event.clone());
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProtocolEvent> {
        self.tx.subscribe()
    }

    /// Full retained log, oldest first.
    pub fn all(&self) -> &[ProtocolEvent] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
