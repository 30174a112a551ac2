//! Per-address cooldown clocks
//!
//! Submissions and analysis requests are throttled independently: one
//! clock per action per address. Checking never mutates; the caller
//! records the timestamp only after every other check has passed, so a
//! rejected operation leaves the clock untouched.

use std::collections::HashMap;

use obscura_account::Address;

use crate::error::LedgerError;

/// Which cooldown clock an operation ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownKind {
    Submission,
    Analysis,
}

#[derive(Default)]
pub struct RateLimiter {
    submissions: HashMap<Address, u64>,
    analyses: HashMap<Address, u64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self, kind: CooldownKind) -> &HashMap<Address, u64> {
        match kind {
            CooldownKind::Submission => &self.submissions,
            CooldownKind::Analysis => &self.analyses,
        }
    }

    /// Seconds until `addr` may act again; 0 means clear.
    pub fn remaining(&self, kind: CooldownKind, addr: &Address, now: u64, cooldown: u64) -> u64 {
        match self.clock(kind).get(addr) {
            Some(last) => (last + cooldown).saturating_sub(now),
            None => 0,
        }
    }

    /// Cooldown guard.
    pub fn require_clear(
        &self,
        kind: CooldownKind,
        addr: &Address,
        now: u64,
        cooldown: u64,
    ) -> Result<(), LedgerError> {
        let remaining_secs = self.remaining(kind, addr, now, cooldown);
        if remaining_secs > 0 {
            return Err(LedgerError::CooldownActive { remaining_secs });
        }
        Ok(())
    }

    /// Record a successful action on the given clock.
    pub fn record(&mut self, kind: CooldownKind, addr: Address, now: u64) {
        match kind {
            CooldownKind::Submission => self.submissions.insert(addr, now),
            CooldownKind::Analysis => self.analyses.insert(addr, now),
        };
    }
}
