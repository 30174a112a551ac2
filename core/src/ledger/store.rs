//! Encrypted store
//!
//! Append-only mapping from (batch id, index) to a ciphertext handle.
//! Records are never mutated or deleted; index assignment lives in the
//! batch ledger, this map just holds the handles.

use std::collections::HashMap;

use obscura_handle::CiphertextHandle;

#[derive(Default)]
pub struct EncryptedStore {
    records: HashMap<(u64, u64), CiphertextHandle>,
}

impl EncryptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. The (batch, index) pair comes from the batch
    /// ledger's counter and is never reused.
    pub fn insert(&mut self, batch_id: u64, index: u64, handle: CiphertextHandle) {
        debug_assert!(
            !self.records.contains_key(&(batch_id, index)),
            "record slots are append-only"
        );
        self.records.insert((batch_id, index), handle);
    }

    pub fn get(&self, batch_id: u64, index: u64) -> Option<&CiphertextHandle> {
        self.records.get(&(batch_id, index))
    }

    pub fn contains(&self, batch_id: u64, index: u64) -> bool {
        self.records.contains_key(&(batch_id, index))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
