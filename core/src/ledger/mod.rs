pub mod access;
pub mod batch;
pub mod bridge;
pub mod ratelimit;
pub mod service;
pub mod state;
pub mod store;

pub use access::AccessControl;
pub use batch::{BatchLedger, BatchMeta};
pub use bridge::{DecryptionContext, OracleBridge, RequestStatus};
pub use ratelimit::{CooldownKind, RateLimiter};
pub use service::{LedgerCommand, LedgerService, unix_now};
pub use state::{BatchInfo, LedgerConfig, LedgerState, LedgerStats, SubmissionReceipt};
pub use store::EncryptedStore;

#[cfg(test)]
mod tests;
