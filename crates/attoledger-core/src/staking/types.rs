use crate::{Amount, LedgerError, Result, Timestamp, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Per-account stake index, starting at 0.
pub type StakeId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolKind {
    Interval { intervals_count: u64, size: Amount },
    Monthly,
}

/// Validated pool parameters.
///
/// `revenue` is in whole percent points; `interval_duration` is stored in
/// seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    revenue: u64,
    interval_duration: u64,
    kind: PoolKind,
}

impl StakingParams {
    /// Interval pool. `interval_duration_days` is converted to seconds.
    pub fn interval(
        revenue: u64,
        intervals_count: u64,
        interval_duration_days: u64,
        size: Amount,
    ) -> Result<Self> {
        if revenue == 0 {
            return Err(LedgerError::NotPositive("Revenue"));
        }
        if intervals_count == 0 {
            return Err(LedgerError::NotPositive("IntervalsCount"));
        }
        let interval_duration = days_to_seconds(interval_duration_days)?;
        if size == 0 {
            return Err(LedgerError::NotPositive("Size"));
        }
        Ok(Self {
            revenue,
            interval_duration,
            kind: PoolKind::Interval {
                intervals_count,
                size,
            },
        })
    }

    /// Monthly pool. `interval_duration_days` is converted to seconds.
    pub fn monthly(revenue: u64, interval_duration_days: u64) -> Result<Self> {
        if revenue == 0 {
            return Err(LedgerError::NotPositive("Revenue"));
        }
        let interval_duration = days_to_seconds(interval_duration_days)?;
        Ok(Self {
            revenue,
            interval_duration,
            kind: PoolKind::Monthly,
        })
    }

    pub fn revenue(&self) -> u64 {
        self.revenue
    }

    pub fn interval_duration(&self) -> u64 {
        self.interval_duration
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }
}

fn days_to_seconds(days: u64) -> Result<u64> {
    if days == 0 {
        return Err(LedgerError::NotPositive("IntervalDuration"));
    }
    days.checked_mul(SECONDS_PER_DAY)
        .ok_or_else(|| LedgerError::Overflow("interval duration in seconds".into()))
}

/// One staking position.
///
/// For interval pools `rewards` is the total payout including principal;
/// for monthly pools it is the reward alone. Use
/// [`super::StakingPool::total_payout`] rather than reading it directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub amount: Amount,
    pub rewards: Amount,
    pub withdrawn: Amount,
    /// Principal share of `withdrawn`.
    pub principal_withdrawn: Amount,
    pub starts_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakeStatus {
    Created,
    PartiallyWithdrawn,
    Exhausted,
}

impl Stake {
    pub fn status(&self, total_payout: Amount) -> StakeStatus {
        if self.withdrawn == 0 {
            StakeStatus::Created
        } else if self.withdrawn < total_payout {
            StakeStatus::PartiallyWithdrawn
        } else {
            StakeStatus::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_params_validate_in_order() {
        assert_eq!(
            StakingParams::interval(0, 0, 0, 0),
            Err(LedgerError::NotPositive("Revenue"))
        );
        assert_eq!(
            StakingParams::interval(15, 0, 0, 0),
            Err(LedgerError::NotPositive("IntervalsCount"))
        );
        assert_eq!(
            StakingParams::interval(15, 5, 0, 0),
            Err(LedgerError::NotPositive("IntervalDuration"))
        );
        assert_eq!(
            StakingParams::interval(15, 5, 100, 0),
            Err(LedgerError::NotPositive("Size"))
        );
    }

    #[test]
    fn durations_are_stored_in_seconds() {
        let params = StakingParams::interval(15, 5, 100, 1).unwrap();
        assert_eq!(params.interval_duration(), 100 * 86_400);
        let monthly = StakingParams::monthly(15, 30).unwrap();
        assert_eq!(monthly.interval_duration(), 30 * 86_400);
        assert_eq!(monthly.kind(), PoolKind::Monthly);
    }

    #[test]
    fn huge_duration_overflows() {
        assert!(matches!(
            StakingParams::monthly(15, u64::MAX),
            Err(LedgerError::Overflow(_))
        ));
    }

    #[test]
    fn status_follows_withdrawn() {
        let mut stake = Stake {
            amount: 100,
            rewards: 115,
            withdrawn: 0,
            principal_withdrawn: 0,
            starts_at: 0,
        };
        assert_eq!(stake.status(115), StakeStatus::Created);
        stake.withdrawn = 10;
        assert_eq!(stake.status(115), StakeStatus::PartiallyWithdrawn);
        stake.withdrawn = 115;
        assert_eq!(stake.status(115), StakeStatus::Exhausted);
    }
}
