use std::collections::BTreeMap;

use tracing::{debug, instrument, warn};

use super::invariants::check_invariants;
use super::math;
use super::types::{PoolKind, Stake, StakeId, StakingParams};
use crate::access::TwoStageOwnable;
use crate::decimal::{add, mul_div_floor, sub};
use crate::events::{Event, EventSink};
use crate::{Address, Amount, Env, LedgerError, Result, Timestamp};

/// Staking pool state machine.
///
/// Tokens staked and tokens reserved for rewards are both held by the pool's
/// own `address` on the token ledger.
///
/// Every balance-changing operation builds the post-state first and runs
/// [`check_invariants`] on it before any token moves; a violation is returned
/// as [`LedgerError::InvariantViolated`] and leaves the pool untouched.
#[derive(Clone, Debug)]
pub struct StakingPool {
    address: Address,
    token: Address,
    ownership: TwoStageOwnable,
    params: StakingParams,

    total_staked: Amount,
    reward_pool: Amount,
    promised_rewards: Amount,
    min_stake_amount: Amount,

    stakes: BTreeMap<Address, Vec<Stake>>,
}

impl StakingPool {
    pub fn new(owner: Address, token: Address, address: Address, params: StakingParams) -> Result<Self> {
        if token.is_zero() {
            return Err(LedgerError::ZeroAddress("Token"));
        }
        if address.is_zero() {
            return Err(LedgerError::ZeroAddress("Pool"));
        }
        Ok(Self {
            address,
            token,
            ownership: TwoStageOwnable::new(owner)?,
            params,
            total_staked: 0,
            reward_pool: 0,
            promised_rewards: 0,
            min_stake_amount: 0,
            stakes: BTreeMap::new(),
        })
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn owner(&self) -> Address {
        self.ownership.owner()
    }

    pub fn nominated_owner(&self) -> Option<Address> {
        self.ownership.nominated_owner()
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    pub fn kind(&self) -> PoolKind {
        self.params.kind()
    }

    pub fn revenue(&self) -> u64 {
        self.params.revenue()
    }

    /// Interval length in seconds.
    pub fn interval_duration(&self) -> u64 {
        self.params.interval_duration()
    }

    /// Monthly pools report a single interval.
    pub fn intervals_count(&self) -> u64 {
        match self.params.kind() {
            PoolKind::Interval {
                intervals_count, ..
            } => intervals_count,
            PoolKind::Monthly => 1,
        }
    }

    /// Monthly pools report zero.
    pub fn size(&self) -> Amount {
        match self.params.kind() {
            PoolKind::Interval { size, .. } => size,
            PoolKind::Monthly => 0,
        }
    }

    /// Principal the pool can still accept.
    ///
    /// Interval pools: `size - total_staked`. Monthly pools:
    /// `reward_pool * 100 / revenue - total_staked`, floored at zero.
    pub fn free_size(&self) -> Result<Amount> {
        match self.params.kind() {
            PoolKind::Interval { size, .. } => Ok(size.saturating_sub(self.total_staked)),
            PoolKind::Monthly => {
                let capacity = mul_div_floor(
                    self.reward_pool,
                    math::PERCENT_BASE,
                    self.params.revenue() as u128,
                )?;
                Ok(capacity.saturating_sub(self.total_staked))
            }
        }
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn reward_pool(&self) -> Amount {
        self.reward_pool
    }

    /// Reward still owed to existing stakes.
    pub fn promised_rewards(&self) -> Amount {
        self.promised_rewards
    }

    /// Reward reserve not yet promised to any stake.
    pub fn unpromised_rewards(&self) -> Amount {
        self.reward_pool.saturating_sub(self.promised_rewards)
    }

    pub fn min_stake_amount(&self) -> Amount {
        self.min_stake_amount
    }

    pub fn stakes_count(&self, account: &Address) -> usize {
        self.stakes.get(account).map_or(0, Vec::len)
    }

    pub fn get_stake(&self, account: &Address, stake_id: StakeId) -> Result<&Stake> {
        let index = usize::try_from(stake_id).map_err(|_| LedgerError::InvalidStakeId)?;
        self.stakes
            .get(account)
            .and_then(|list| list.get(index))
            .ok_or(LedgerError::InvalidStakeId)
    }

    /// Most recent first. Empty when `offset >= stakes_count(account)`.
    pub fn get_stakes(&self, account: &Address, offset: usize, limit: usize) -> Vec<Stake> {
        match self.stakes.get(account) {
            Some(list) if offset < list.len() => {
                list.iter().rev().skip(offset).take(limit).cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn iter_stakes(&self) -> impl Iterator<Item = (&Address, &Stake)> {
        self.stakes
            .iter()
            .flat_map(|(account, list)| list.iter().map(move |s| (account, s)))
    }

    /// Everything a stake will ever pay out, principal included.
    pub fn total_payout(&self, stake: &Stake) -> Result<Amount> {
        match self.params.kind() {
            PoolKind::Interval { .. } => Ok(stake.rewards),
            PoolKind::Monthly => add(stake.amount, stake.rewards),
        }
    }

    pub fn available_to_withdraw(&self, account: &Address, stake_id: StakeId, now: Timestamp) -> Result<Amount> {
        let stake = self.get_stake(account, stake_id)?;
        let vested = match self.params.kind() {
            PoolKind::Interval {
                intervals_count, ..
            } => {
                let elapsed =
                    math::elapsed_intervals(stake.starts_at, now, self.params.interval_duration())?;
                math::vested(stake.rewards, elapsed, intervals_count)?
            }
            PoolKind::Monthly => {
                let ends_at = stake
                    .starts_at
                    .saturating_add(self.params.interval_duration());
                if now < ends_at {
                    0
                } else {
                    add(stake.amount, stake.rewards)?
                }
            }
        };
        Ok(vested.saturating_sub(stake.withdrawn))
    }

    // =========================================================================
    // Staker operations
    // =========================================================================

    /// Opens a stake for `caller`. Requires `caller` to have approved the pool
    /// for `amount`.
    #[instrument(skip(self, env), fields(pool = %self.address))]
    pub fn stake(&mut self, env: &mut Env<'_>, caller: Address, amount: Amount, now: Timestamp) -> Result<StakeId> {
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        if amount < self.min_stake_amount {
            return Err(LedgerError::AmountBelowMinimum);
        }

        let (rewards, reward_portion) = match self.params.kind() {
            PoolKind::Interval { .. } => {
                if amount > self.free_size()? {
                    return Err(LedgerError::CapacityExceeded);
                }
                let rewards = math::interval_rewards(amount, self.params.revenue())?;
                (rewards, sub(rewards, amount)?)
            }
            PoolKind::Monthly => {
                if let Some(last) = self.stakes.get(&caller).and_then(|list| list.last()) {
                    let ends_at = last
                        .starts_at
                        .saturating_add(self.params.interval_duration());
                    if ends_at > now {
                        return Err(LedgerError::PreviousStakeNotOver);
                    }
                }
                let rewards = math::monthly_rewards(amount, self.params.revenue())?;
                (rewards, rewards)
            }
        };
        if reward_portion > self.unpromised_rewards() {
            return Err(LedgerError::NotEnoughRewards);
        }

        let stake_id = self.stakes_count(&caller) as StakeId;
        let mut post = self.clone();
        post.total_staked = add(self.total_staked, amount)?;
        post.promised_rewards = add(self.promised_rewards, reward_portion)?;
        post.stakes.entry(caller).or_default().push(Stake {
            amount,
            rewards,
            withdrawn: 0,
            principal_withdrawn: 0,
            starts_at: now,
        });
        check_invariants(&post)?;

        env.ledger
            .transfer_from(self.token, self.address, caller, self.address, amount)?;

        // Commit.
        *self = post;
        env.events.emit(
            self.address,
            Event::Staked {
                account: caller,
                stake_id,
                amount,
            },
        );
        debug!(stake_id, rewards, "Stake opened");
        Ok(stake_id)
    }

    /// Pays out `amount` of the vested balance, split between principal and
    /// reward in proportion to what remains of each.
    #[instrument(skip(self, env), fields(pool = %self.address))]
    pub fn withdraw(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        stake_id: StakeId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        let available = self.available_to_withdraw(&caller, stake_id, now)?;
        if amount > available {
            return Err(LedgerError::InsufficientAvailable);
        }

        let stake = self.get_stake(&caller, stake_id)?;
        let remaining_total = sub(self.total_payout(stake)?, stake.withdrawn)?;
        let remaining_principal = sub(stake.amount, stake.principal_withdrawn)?;
        let principal = math::principal_share(amount, remaining_principal, remaining_total)?;
        let reward = sub(amount, principal)?;

        let mut post = self.clone();
        let entry = post
            .stakes
            .get_mut(&caller)
            .and_then(|list| list.get_mut(stake_id as usize))
            .ok_or(LedgerError::InvalidStakeId)?;
        entry.withdrawn = add(entry.withdrawn, amount)?;
        entry.principal_withdrawn = add(entry.principal_withdrawn, principal)?;
        post.total_staked = sub(self.total_staked, principal)?;
        post.reward_pool = sub(self.reward_pool, reward)?;
        post.promised_rewards = sub(self.promised_rewards, reward)?;
        check_invariants(&post)?;

        env.ledger
            .transfer(self.token, self.address, caller, amount)?;

        // Commit.
        *self = post;
        env.events.emit(
            self.address,
            Event::Withdrawn {
                account: caller,
                stake_id,
                amount,
            },
        );
        debug!(principal, reward, "Stake withdrawn");
        Ok(())
    }

    // =========================================================================
    // Owner operations
    // =========================================================================

    /// Funds the reward reserve from the owner. Requires prior approval.
    #[instrument(skip(self, env), fields(pool = %self.address))]
    pub fn increase_reward_pool(&mut self, env: &mut Env<'_>, caller: Address, amount: Amount) -> Result<()> {
        self.ownership.require_owner(&caller)?;
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        let mut post = self.clone();
        post.reward_pool = add(self.reward_pool, amount)?;
        check_invariants(&post)?;

        env.ledger
            .transfer_from(self.token, self.address, caller, self.address, amount)?;

        // Commit.
        *self = post;
        let reward_pool = self.reward_pool;
        env.events.emit(
            self.address,
            Event::RewardPoolIncreased {
                owner: caller,
                amount,
            },
        );
        debug!(reward_pool, "Reward pool increased");
        Ok(())
    }

    /// Returns unpromised reward reserve to the owner.
    #[instrument(skip(self, env), fields(pool = %self.address))]
    pub fn decrease_reward_pool(&mut self, env: &mut Env<'_>, caller: Address, amount: Amount) -> Result<()> {
        self.ownership.require_owner(&caller)?;
        if amount == 0 {
            return Err(LedgerError::AmountNotPositive);
        }
        let unpromised = self.unpromised_rewards();
        if unpromised == 0 {
            return Err(LedgerError::NoTokensToDecrease);
        }
        if amount > unpromised {
            warn!(unpromised, "Decrease exceeds unpromised reserve");
            return Err(LedgerError::InsufficientPoolReserve);
        }
        let mut post = self.clone();
        post.reward_pool = sub(self.reward_pool, amount)?;
        check_invariants(&post)?;

        env.ledger
            .transfer(self.token, self.address, caller, amount)?;

        // Commit.
        *self = post;
        let reward_pool = self.reward_pool;
        env.events.emit(
            self.address,
            Event::RewardPoolDecreased {
                owner: caller,
                amount,
            },
        );
        debug!(reward_pool, "Reward pool decreased");
        Ok(())
    }

    pub fn set_min_stake_amount(&mut self, env: &mut Env<'_>, caller: Address, value: Amount) -> Result<()> {
        self.ownership.require_owner(&caller)?;
        self.min_stake_amount = value;
        env.events.emit(
            self.address,
            Event::MinStakeAmountUpdated {
                owner: caller,
                value,
            },
        );
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
