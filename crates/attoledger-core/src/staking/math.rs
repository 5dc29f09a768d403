use crate::decimal::{add, mul_div_floor};
use crate::{Amount, LedgerError, Result, Timestamp};

pub const PERCENT_BASE: u128 = 100;

/// Total payout of an interval stake: `floor(amount * (revenue + 100) / 100)`.
pub fn interval_rewards(amount: Amount, revenue: u64) -> Result<Amount> {
    let factor = add(revenue as u128, PERCENT_BASE)?;
    mul_div_floor(amount, factor, PERCENT_BASE)
}

/// Reward of a monthly stake: `floor(amount * revenue / 100)`.
pub fn monthly_rewards(amount: Amount, revenue: u64) -> Result<Amount> {
    mul_div_floor(amount, revenue as u128, PERCENT_BASE)
}

/// Whole intervals elapsed since `starts_at`. Zero if `now` precedes it.
pub fn elapsed_intervals(starts_at: Timestamp, now: Timestamp, interval_duration: u64) -> Result<u64> {
    if interval_duration == 0 {
        return Err(LedgerError::InvalidInput("interval_duration must be > 0".into()));
    }
    Ok(now.saturating_sub(starts_at) / interval_duration)
}

/// Linearly vested portion of `total`:
/// `floor(total * min(elapsed, count) / count)`, exactly `total` once every
/// interval has elapsed.
pub fn vested(total: Amount, elapsed: u64, intervals_count: u64) -> Result<Amount> {
    if intervals_count == 0 {
        return Err(LedgerError::InvalidInput("intervals_count must be > 0".into()));
    }
    if elapsed >= intervals_count {
        return Ok(total);
    }
    mul_div_floor(total, elapsed as u128, intervals_count as u128)
}

/// Principal share of a withdrawal:
/// `floor(amount * remaining_principal / remaining_total)`.
///
/// A withdrawal of the whole remaining total takes exactly the remaining
/// principal.
pub fn principal_share(amount: Amount, remaining_principal: Amount, remaining_total: Amount) -> Result<Amount> {
    if amount > remaining_total {
        return Err(LedgerError::InsufficientAvailable);
    }
    mul_div_floor(amount, remaining_principal, remaining_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn reward_formulas() {
        let stake = 15 * E18 / 10;
        assert_eq!(interval_rewards(stake, 15).unwrap(), 1_725_000_000_000_000_000);
        assert_eq!(monthly_rewards(stake, 15).unwrap(), 225_000_000_000_000_000);
    }

    #[test]
    fn vesting_caps_at_total() {
        assert_eq!(vested(1000, 0, 5).unwrap(), 0);
        assert_eq!(vested(1000, 1, 5).unwrap(), 200);
        assert_eq!(vested(1001, 4, 5).unwrap(), 800);
        assert_eq!(vested(1001, 5, 5).unwrap(), 1001);
        assert_eq!(vested(1001, 50, 5).unwrap(), 1001);
    }

    #[test]
    fn elapsed_counts_whole_intervals() {
        assert_eq!(elapsed_intervals(100, 50, 10).unwrap(), 0);
        assert_eq!(elapsed_intervals(100, 109, 10).unwrap(), 0);
        assert_eq!(elapsed_intervals(100, 110, 10).unwrap(), 1);
        assert!(elapsed_intervals(0, 1, 0).is_err());
    }

    #[test]
    fn principal_share_of_partial_and_final_withdrawals() {
        let amount = 15 * E18 / 10;
        let total = interval_rewards(amount, 15).unwrap();
        let first = 1_725 * E18 / 10_000;
        let p1 = principal_share(first, amount, total).unwrap();
        assert_eq!(p1, 15 * E18 / 100);
        let rest = total - first;
        let p2 = principal_share(rest, amount - p1, rest).unwrap();
        assert_eq!(p2, amount - p1);
    }

    proptest! {
        #[test]
        fn vested_is_monotone(total in any::<u64>(), count in 1u64..100, a in 0u64..200, b in 0u64..200) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(vested(total as u128, lo, count).unwrap() <= vested(total as u128, hi, count).unwrap());
        }

        #[test]
        fn principal_share_never_exceeds_remaining(
            principal in 0u64..u64::MAX,
            reward in 0u64..u64::MAX,
            frac in 0u64..=1000,
        ) {
            let total = principal as u128 + reward as u128;
            let amount = total * frac as u128 / 1000;
            let p = principal_share(amount, principal as u128, total.max(1)).unwrap();
            prop_assert!(p <= principal as u128);
            prop_assert!(amount - p <= reward as u128);
        }
    }
}
