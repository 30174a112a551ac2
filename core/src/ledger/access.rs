//! Access control
//!
//! Owner identity, the provider allow-list and the global pause flag.
//! Guards are explicit functions checked at the top of each command
//! handler; nothing here mutates state on a failed check.

use std::collections::HashSet;

use obscura_account::Address;

use crate::error::LedgerError;

pub struct AccessControl {
    owner: Address,
    providers: HashSet<Address>,
    paused: bool,
    cooldown_secs: u64,
}

impl AccessControl {
    pub fn new(owner: Address, cooldown_secs: u64) -> Self {
        Self {
            owner,
            providers: HashSet::new(),
            paused: false,
            cooldown_secs,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    pub fn is_provider(&self, addr: &Address) -> bool {
        self.providers.contains(addr)
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Owner guard for administrative calls.
    pub fn require_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner { caller });
        }
        Ok(())
    }

    /// Provider guard for submissions.
    pub fn require_provider(&self, caller: Address) -> Result<(), LedgerError> {
        if !self.providers.contains(&caller) {
            return Err(LedgerError::NotProvider { caller });
        }
        Ok(())
    }

    /// Pause guard for submissions.
    pub fn require_not_paused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    pub fn set_owner(&mut self, new_owner: Address) -> Address {
        std::mem::replace(&mut self.owner, new_owner)
    }

    /// Returns true if the provider was newly added (idempotent).
    pub fn add_provider(&mut self, addr: Address) -> bool {
        self.providers.insert(addr)
    }

    /// Returns true if the provider was present (idempotent).
    pub fn remove_provider(&mut self, addr: &Address) -> bool {
        self.providers.remove(addr)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn set_cooldown_secs(&mut self, secs: u64) {
        self.cooldown_secs = secs;
    }
}
