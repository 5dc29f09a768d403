//! Token ledger collaborator.
//!
//! [`TokenLedger`] is the fungible-token surface the engines need: balances,
//! allowances and transfers across any number of tokens, keyed by token
//! address. [`InMemoryTokenLedger`] is a complete implementation useful for
//! tests and simulation.

use crate::decimal::{add, sub};
use crate::{Address, Amount, LedgerError, Result};
use std::collections::BTreeMap;
use tracing::warn;

/// Multi-token balance and allowance bookkeeping.
///
/// Every mutating method is all-or-nothing: on error no balance or allowance
/// has changed.
pub trait TokenLedger {
    fn balance_of(&self, token: Address, holder: Address) -> Amount;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> Amount;

    fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: Amount)
        -> Result<()>;

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: Amount)
        -> Result<()>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    fn mint(&mut self, token: Address, to: Address, amount: Amount) -> Result<()>;

    fn burn(&mut self, token: Address, from: Address, amount: Amount) -> Result<()>;
}

/// In-memory [`TokenLedger`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryTokenLedger {
    balances: BTreeMap<(Address, Address), Amount>,
    allowances: BTreeMap<(Address, Address, Address), Amount>,
    supplies: BTreeMap<Address, Amount>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self, token: Address) -> Amount {
        self.supplies.get(&token).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, token: Address, holder: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&(token, holder));
        } else {
            self.balances.insert((token, holder), amount);
        }
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, token: Address, holder: Address) -> Amount {
        self.balances.get(&(token, holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress("Spender"));
        }
        self.allowances.insert((token, owner, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("Recipient"));
        }
        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        if from == to {
            return Ok(());
        }
        let to_balance = add(self.balance_of(token, to), amount)?;

        // Commit.
        self.set_balance(token, from, from_balance - amount);
        self.set_balance(token, to, to_balance);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance);
        }
        self.transfer(token, from, to, amount)?;
        self.allowances
            .insert((token, from, spender), allowed - amount);
        Ok(())
    }

    fn mint(&mut self, token: Address, to: Address, amount: Amount) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("Recipient"));
        }
        let supply = add(self.total_supply(token), amount)?;
        let balance = add(self.balance_of(token, to), amount)?;
        self.supplies.insert(token, supply);
        self.set_balance(token, to, balance);
        Ok(())
    }

    fn burn(&mut self, token: Address, from: Address, amount: Amount) -> Result<()> {
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        let supply = sub(self.total_supply(token), amount)?;
        self.supplies.insert(token, supply);
        self.set_balance(token, from, balance - amount);
        Ok(())
    }
}

// =============================================================================
// Transfer batches
// =============================================================================

/// One applied transfer leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Groups several transfers into one all-or-nothing unit.
///
/// If a leg fails, or the batch is dropped without [`TransferBatch::commit`],
/// the legs already applied are reversed in reverse order.
pub struct TransferBatch<'a> {
    ledger: &'a mut dyn TokenLedger,
    applied: Vec<Transfer>,
    committed: bool,
}

impl<'a> TransferBatch<'a> {
    pub fn new(ledger: &'a mut dyn TokenLedger) -> Self {
        Self {
            ledger,
            applied: Vec::new(),
            committed: false,
        }
    }

    /// Applies one leg. Zero-amount legs are skipped.
    pub fn transfer(&mut self, token: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        match self.ledger.transfer(token, from, to, amount) {
            Ok(()) => {
                self.applied.push(Transfer {
                    token,
                    from,
                    to,
                    amount,
                });
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    pub fn commit(mut self) -> Vec<Transfer> {
        self.committed = true;
        std::mem::take(&mut self.applied)
    }

    fn rollback(&mut self) {
        while let Some(leg) = self.applied.pop() {
            // The reverse leg moves funds that were just credited, so it can
            // only fail if the ledger itself is inconsistent.
            if let Err(e) = self.ledger.transfer(leg.token, leg.to, leg.from, leg.amount) {
                warn!(error = %e, token = %leg.token, "Failed to reverse transfer leg");
            }
        }
    }
}

impl Drop for TransferBatch<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
