use tracing::{debug, instrument};

use super::types::{Deposit, DepositId, LockupParams};
use crate::access::TwoStageOwnable;
use crate::decimal::{add, sub};
use crate::events::{Event, EventSink};
use crate::staking::math::vested;
use crate::{Address, Amount, Env, LedgerError, Result, Timestamp};

/// Lockup state machine. Deposited tokens are held at `address`.
#[derive(Clone, Debug)]
pub struct Lockup {
    address: Address,
    token: Address,
    ownership: TwoStageOwnable,
    params: LockupParams,
    total_deposit: Amount,
    deposits: Vec<Deposit>,
}

impl Lockup {
    pub fn new(owner: Address, token: Address, address: Address, params: LockupParams) -> Result<Self> {
        if token.is_zero() {
            return Err(LedgerError::ZeroAddress("Token"));
        }
        if address.is_zero() {
            return Err(LedgerError::ZeroAddress("Lockup"));
        }
        Ok(Self {
            address,
            token,
            ownership: TwoStageOwnable::new(owner)?,
            params,
            total_deposit: 0,
            deposits: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn params(&self) -> &LockupParams {
        &self.params
    }

    /// Principal deposited and not yet withdrawn.
    pub fn total_deposit(&self) -> Amount {
        self.total_deposit
    }

    pub fn deposits_count(&self) -> usize {
        self.deposits.len()
    }

    pub fn get_deposit(&self, deposit_id: DepositId) -> Result<&Deposit> {
        usize::try_from(deposit_id)
            .ok()
            .and_then(|i| self.deposits.get(i))
            .ok_or(LedgerError::InvalidDepositId)
    }

    /// Insertion order. Empty when `offset >= deposits_count()`.
    pub fn get_deposits(&self, offset: usize, limit: usize) -> Vec<Deposit> {
        self.deposits.iter().skip(offset).take(limit).cloned().collect()
    }

    pub fn available_to_withdraw(&self, deposit_id: DepositId, now: Timestamp) -> Result<Amount> {
        let deposit = self.get_deposit(deposit_id)?;
        let released = if now < deposit.lockup_ends_at {
            0
        } else {
            let elapsed = (now - deposit.lockup_ends_at) / self.params.unlock_interval_duration();
            vested(deposit.amount, elapsed, self.params.unlock_intervals_count())?
        };
        Ok(released.saturating_sub(deposit.withdrawn))
    }

    #[instrument(skip(self, env), fields(lockup = %self.address))]
    pub fn deposit(&mut self, env: &mut Env<'_>, caller: Address, amount: Amount, now: Timestamp) -> Result<DepositId> {
        self.ownership.require_owner(&caller)?;
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        let lockup_ends_at = now
            .checked_add(self.params.lockup_duration())
            .ok_or_else(|| LedgerError::Overflow("lockup end".into()))?;
        let unlock_ends_at = lockup_ends_at
            .checked_add(self.params.unlock_duration())
            .ok_or_else(|| LedgerError::Overflow("unlock end".into()))?;
        let total_deposit = add(self.total_deposit, amount)?;
        let deposit_id = self.deposits.len() as DepositId;

        env.ledger
            .transfer_from(self.token, self.address, caller, self.address, amount)?;

        // Commit.
        self.total_deposit = total_deposit;
        self.deposits.push(Deposit {
            amount,
            withdrawn: 0,
            deposited_at: now,
            lockup_ends_at,
            unlock_ends_at,
        });
        env.events.emit(
            self.address,
            Event::Deposited {
                account: caller,
                deposit_id,
                amount,
            },
        );
        debug!(deposit_id, lockup_ends_at, "Deposit locked");
        Ok(deposit_id)
    }

    #[instrument(skip(self, env), fields(lockup = %self.address))]
    pub fn withdraw(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        deposit_id: DepositId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.ownership.require_owner(&caller)?;
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        if amount > self.available_to_withdraw(deposit_id, now)? {
            return Err(LedgerError::InsufficientAvailable);
        }
        let deposit = self.get_deposit(deposit_id)?;
        let withdrawn = add(deposit.withdrawn, amount)?;
        let total_deposit = sub(self.total_deposit, amount)?;

        env.ledger
            .transfer(self.token, self.address, caller, amount)?;

        // Commit.
        if let Some(deposit) = self.deposits.get_mut(deposit_id as usize) {
            deposit.withdrawn = withdrawn;
        }
        self.total_deposit = total_deposit;
        env.events.emit(
            self.address,
            Event::DepositWithdrawn {
                account: caller,
                deposit_id,
                amount,
            },
        );
        debug!(withdrawn, "Deposit withdrawn");
        Ok(())
    }

    pub fn nominate_new_owner(&mut self, events: &mut dyn EventSink, caller: Address, nominee: Address) -> Result<()> {
        self.ownership.nominate_new_owner(&caller, nominee)?;
        events.emit(
            self.address,
            Event::OwnerNominated {
                owner: caller,
                nominee,
            },
        );
        Ok(())
    }

    pub fn accept_ownership(&mut self, events: &mut dyn EventSink, caller: Address) -> Result<()> {
        let previous_owner = self.ownership.accept_ownership(&caller)?;
        events.emit(
            self.address,
            Event::OwnershipTransferred {
                previous_owner,
                new_owner: caller,
            },
        );
        Ok(())
    }
}
