//! Batch ledger
//!
//! Batch ids increase monotonically from 1 and exactly one batch is
//! current at any time. Closing is terminal for an id; the only way to
//! resume activity is opening a new batch, which starts a fresh
//! submission counter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Per-batch bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchMeta {
    pub closed: bool,
    /// Submissions recorded so far; also the next index to assign.
    pub submissions: u64,
}

pub struct BatchLedger {
    current: u64,
    batches: HashMap<u64, BatchMeta>,
}

impl BatchLedger {
    /// Starts with batch 1 open.
    pub fn new() -> Self {
        let mut batches = HashMap::new();
        batches.insert(1, BatchMeta::default());
        Self { current: 1, batches }
    }

    pub fn current_id(&self) -> u64 {
        self.current
    }

    pub fn meta(&self, batch_id: u64) -> Option<&BatchMeta> {
        self.batches.get(&batch_id)
    }

    /// Guard: batch exists and is still open.
    pub fn require_open(&self, batch_id: u64) -> Result<(), LedgerError> {
        let meta = self
            .batches
            .get(&batch_id)
            .ok_or(LedgerError::UnknownBatch { batch_id })?;
        if meta.closed {
            return Err(LedgerError::BatchClosed { batch_id });
        }
        Ok(())
    }

    /// Guard: `index` addresses an existing record in `batch_id`.
    pub fn require_index(&self, batch_id: u64, index: u64) -> Result<(), LedgerError> {
        let meta = self
            .batches
            .get(&batch_id)
            .ok_or(LedgerError::UnknownBatch { batch_id })?;
        if index >= meta.submissions {
            return Err(LedgerError::IndexOutOfRange {
                batch_id,
                index,
                count: meta.submissions,
            });
        }
        Ok(())
    }

    /// Assign the next index in the current batch. Caller must have
    /// checked `require_open` first.
    pub fn assign_index(&mut self) -> u64 {
        let meta = self
            .batches
            .get_mut(&self.current)
            .expect("current batch always exists");
        let index = meta.submissions;
        meta.submissions += 1;
        index
    }

    /// Open the next batch and make it current.
    pub fn open_new(&mut self) -> u64 {
        self.current += 1;
        self.batches.insert(self.current, BatchMeta::default());
        self.current
    }

    /// Close the current batch. Terminal: there is no un-close.
    pub fn close_current(&mut self) -> Result<u64, LedgerError> {
        let batch_id = self.current;
        let meta = self
            .batches
            .get_mut(&batch_id)
            .ok_or(LedgerError::UnknownBatch { batch_id })?;
        if meta.closed {
            return Err(LedgerError::BatchClosed { batch_id });
        }
        meta.closed = true;
        Ok(batch_id)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

impl Default for BatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_one_open_by_default() {
        let ledger = BatchLedger::new();
        assert_eq!(ledger.current_id(), 1);
        assert!(ledger.require_open(1).is_ok());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut ledger = BatchLedger::new();
        assert_eq!(ledger.open_new(), 2);
        assert_eq!(ledger.open_new(), 3);
        assert_eq!(ledger.current_id(), 3);
    }

    #[test]
    fn test_close_is_terminal() {
        let mut ledger = BatchLedger::new();
        assert_eq!(ledger.close_current().unwrap(), 1);
        assert!(matches!(
            ledger.close_current(),
            Err(LedgerError::BatchClosed { batch_id: 1 })
        ));
        assert!(matches!(
            ledger.require_open(1),
            Err(LedgerError::BatchClosed { batch_id: 1 })
        ));

        // Reopening happens only through a new id with a fresh counter.
        let next = ledger.open_new();
        assert_eq!(next, 2);
        assert_eq!(ledger.meta(2).unwrap().submissions, 0);
    }

    #[test]
    fn test_indices_are_dense() {
        let mut ledger = BatchLedger::new();
        assert_eq!(ledger.assign_index(), 0);
        assert_eq!(ledger.assign_index(), 1);
        assert_eq!(ledger.assign_index(), 2);
        assert_eq!(ledger.meta(1).unwrap().submissions, 3);

        assert!(ledger.require_index(1, 2).is_ok());
        assert!(matches!(
            ledger.require_index(1, 3),
            Err(LedgerError::IndexOutOfRange { count: 3, .. })
        ));
        assert!(matches!(
            ledger.require_index(9, 0),
            Err(LedgerError::UnknownBatch { batch_id: 9 })
        ));
    }
}
