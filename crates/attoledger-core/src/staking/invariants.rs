use super::pool::StakingPool;
use super::types::PoolKind;
use crate::LedgerError;

/// Stable identifiers for staking pool invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantId {
    /// `promised_rewards` exceeded `reward_pool`.
    RewardsCovered,

    /// Interval pool principal exceeded `size`.
    SizeRespected,

    /// `total_staked` disagreed with the sum of unreturned principal.
    StakedMatchesStakes,

    /// `promised_rewards` disagreed with the sum of unpaid reward portions.
    PromisedMatchesStakes,

    /// A stake paid out more than its total payout.
    WithdrawnBounded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvariantViolation {
    pub id: InvariantId,
    pub details: String,
}

impl InvariantViolation {
    pub fn new(id: InvariantId, details: impl Into<String>) -> Self {
        Self {
            id,
            details: details.into(),
        }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.id, self.details)
    }
}

impl std::error::Error for InvariantViolation {}

impl From<InvariantViolation> for LedgerError {
    fn from(v: InvariantViolation) -> Self {
        LedgerError::InvariantViolated(v.to_string())
    }
}

/// Checks every pool invariant in O(stakes).
pub fn check_invariants(pool: &StakingPool) -> Result<(), InvariantViolation> {
    if pool.promised_rewards() > pool.reward_pool() {
        return Err(InvariantViolation::new(
            InvariantId::RewardsCovered,
            format!(
                "promised {} > reward_pool {}",
                pool.promised_rewards(),
                pool.reward_pool()
            ),
        ));
    }

    if let PoolKind::Interval { size, .. } = pool.kind() {
        if pool.total_staked() > size {
            return Err(InvariantViolation::new(
                InvariantId::SizeRespected,
                format!("total_staked {} > size {}", pool.total_staked(), size),
            ));
        }
    }

    let mut principal_sum: u128 = 0;
    let mut unpaid_reward_sum: u128 = 0;
    for (account, stake) in pool.iter_stakes() {
        let payout = pool.total_payout(stake).map_err(|e| {
            InvariantViolation::new(InvariantId::WithdrawnBounded, e.to_string())
        })?;
        if stake.withdrawn > payout || stake.principal_withdrawn > stake.amount {
            return Err(InvariantViolation::new(
                InvariantId::WithdrawnBounded,
                format!(
                    "{account}: withdrawn {} of {payout}, principal {} of {}",
                    stake.withdrawn, stake.principal_withdrawn, stake.amount
                ),
            ));
        }
        let reward_total = payout.saturating_sub(stake.amount);
        let reward_paid = stake.withdrawn.saturating_sub(stake.principal_withdrawn);
        principal_sum = principal_sum.saturating_add(stake.amount - stake.principal_withdrawn);
        unpaid_reward_sum = unpaid_reward_sum.saturating_add(reward_total.saturating_sub(reward_paid));
    }

    if principal_sum != pool.total_staked() {
        return Err(InvariantViolation::new(
            InvariantId::StakedMatchesStakes,
            format!("sum {principal_sum} != total_staked {}", pool.total_staked()),
        ));
    }
    if unpaid_reward_sum != pool.promised_rewards() {
        return Err(InvariantViolation::new(
            InvariantId::PromisedMatchesStakes,
            format!(
                "sum {unpaid_reward_sum} != promised {}",
                pool.promised_rewards()
            ),
        ));
    }
    Ok(())
}
