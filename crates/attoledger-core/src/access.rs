//! Ownership capabilities composed by the engines.
//!
//! Both types are pure bookkeeping: they check and mutate the owner set and
//! report what actually changed. The owning engine emits the matching events.

use crate::{Address, LedgerError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// MultiOwnable
// =============================================================================

/// Ordered set of owners, any of whom may invoke owner-only operations.
///
/// Invariants:
/// - never empty,
/// - no duplicates, first-seen order preserved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiOwnable {
    owners: Vec<Address>,
}

impl MultiOwnable {
    pub fn new(owners: &[Address]) -> Result<Self> {
        if owners.is_empty() {
            return Err(LedgerError::OwnersRequired);
        }
        let mut deduped = Vec::with_capacity(owners.len());
        for owner in owners {
            if !deduped.contains(owner) {
                deduped.push(*owner);
            }
        }
        Ok(Self { owners: deduped })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn owners_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_owner(&self, account: &Address) -> bool {
        self.owners.contains(account)
    }

    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if !self.is_owner(caller) {
            warn!(caller = %caller, "Rejected non-owner caller");
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    /// Adds every address not already an owner. Returns the addresses that
    /// were actually added, in input order.
    pub fn add_owners(&mut self, caller: &Address, owners: &[Address]) -> Result<Vec<Address>> {
        self.require_owner(caller)?;
        let mut added = Vec::new();
        for owner in owners {
            if !self.owners.contains(owner) {
                self.owners.push(*owner);
                added.push(*owner);
            }
        }
        Ok(added)
    }

    /// Removes every listed address that is an owner. Returns the addresses
    /// that were actually removed, in input order.
    ///
    /// Fails without mutating if the removal would leave no owner.
    pub fn remove_owners(&mut self, caller: &Address, owners: &[Address]) -> Result<Vec<Address>> {
        self.require_owner(caller)?;
        let mut removed: Vec<Address> = Vec::new();
        for owner in owners {
            if self.owners.contains(owner) && !removed.contains(owner) {
                removed.push(*owner);
            }
        }
        if removed.len() == self.owners.len() {
            return Err(LedgerError::MustHaveOneOwner);
        }

        // Commit.
        self.owners.retain(|o| !removed.contains(o));
        Ok(removed)
    }
}

// =============================================================================
// TwoStageOwnable
// =============================================================================

/// Single owner with nominate-then-accept transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoStageOwnable {
    owner: Address,
    nominated_owner: Option<Address>,
}

impl TwoStageOwnable {
    pub fn new(owner: Address) -> Result<Self> {
        if owner.is_zero() {
            return Err(LedgerError::ZeroAddress("Owner"));
        }
        Ok(Self {
            owner,
            nominated_owner: None,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn nominated_owner(&self) -> Option<Address> {
        self.nominated_owner
    }

    pub fn require_owner(&self, caller: &Address) -> Result<()> {
        if *caller != self.owner {
            warn!(caller = %caller, "Rejected non-owner caller");
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    pub fn nominate_new_owner(&mut self, caller: &Address, nominee: Address) -> Result<()> {
        self.require_owner(caller)?;
        if nominee.is_zero() {
            return Err(LedgerError::ZeroAddress("New owner"));
        }
        if nominee == self.owner {
            return Err(LedgerError::AlreadyOwner);
        }
        if self.nominated_owner == Some(nominee) {
            return Err(LedgerError::AlreadyNominated);
        }
        self.nominated_owner = Some(nominee);
        Ok(())
    }

    /// Completes the transfer. Returns the previous owner.
    pub fn accept_ownership(&mut self, caller: &Address) -> Result<Address> {
        if self.nominated_owner != Some(*caller) {
            return Err(LedgerError::NotNominated);
        }
        let previous = self.owner;
        self.owner = *caller;
        self.nominated_owner = None;
        Ok(previous)
    }
}
