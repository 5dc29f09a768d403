use crate::{Amount, LedgerError, Result, Timestamp, SECONDS_PER_WEEK};
use serde::{Deserialize, Serialize};

/// Deposit index, starting at 0.
pub type DepositId = u64;

/// Validated lockup parameters, stored in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockupParams {
    lockup_duration: u64,
    unlock_duration: u64,
    unlock_intervals_count: u64,
}

impl LockupParams {
    /// Durations are given in weeks.
    pub fn new(lockup_weeks: u64, unlock_weeks: u64, unlock_intervals_count: u64) -> Result<Self> {
        if lockup_weeks == 0 {
            return Err(LedgerError::NotPositive("LockupDuration"));
        }
        if unlock_weeks == 0 {
            return Err(LedgerError::NotPositive("UnlockDuration"));
        }
        if unlock_intervals_count == 0 {
            return Err(LedgerError::NotPositive("UnlockIntervalsCount"));
        }
        let lockup_duration = weeks_to_seconds(lockup_weeks)?;
        let unlock_duration = weeks_to_seconds(unlock_weeks)?;
        if unlock_duration / unlock_intervals_count == 0 {
            return Err(LedgerError::InvalidInput(
                "unlock interval shorter than one second".into(),
            ));
        }
        Ok(Self {
            lockup_duration,
            unlock_duration,
            unlock_intervals_count,
        })
    }

    pub fn lockup_duration(&self) -> u64 {
        self.lockup_duration
    }

    pub fn unlock_duration(&self) -> u64 {
        self.unlock_duration
    }

    pub fn unlock_intervals_count(&self) -> u64 {
        self.unlock_intervals_count
    }

    /// Length of one unlock interval in seconds, never zero.
    pub fn unlock_interval_duration(&self) -> u64 {
        self.unlock_duration / self.unlock_intervals_count
    }
}

fn weeks_to_seconds(weeks: u64) -> Result<u64> {
    weeks
        .checked_mul(SECONDS_PER_WEEK)
        .ok_or_else(|| LedgerError::Overflow("duration in seconds".into()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub amount: Amount,
    pub withdrawn: Amount,
    pub deposited_at: Timestamp,
    pub lockup_ends_at: Timestamp,
    pub unlock_ends_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_validate_in_order() {
        assert_eq!(
            LockupParams::new(0, 0, 0),
            Err(LedgerError::NotPositive("LockupDuration"))
        );
        assert_eq!(
            LockupParams::new(1, 0, 0),
            Err(LedgerError::NotPositive("UnlockDuration"))
        );
        assert_eq!(
            LockupParams::new(1, 1, 0),
            Err(LedgerError::NotPositive("UnlockIntervalsCount"))
        );
    }

    #[test]
    fn durations_convert_from_weeks() {
        let params = LockupParams::new(100, 500, 5).unwrap();
        assert_eq!(params.lockup_duration(), 100 * SECONDS_PER_WEEK);
        assert_eq!(params.unlock_duration(), 500 * SECONDS_PER_WEEK);
        assert_eq!(params.unlock_interval_duration(), 100 * SECONDS_PER_WEEK);
    }

    #[test]
    fn sub_second_intervals_rejected() {
        assert!(LockupParams::new(1, 1, SECONDS_PER_WEEK + 1).is_err());
    }
}
