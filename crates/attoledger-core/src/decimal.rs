//! Fixed-point ratios with an 18-decimal mantissa.
//!
//! A [`Ratio`] is `mantissa / 10^18`. Applying a ratio to an amount computes
//! `floor(amount * mantissa / 10^18)` through a 256-bit intermediate, so the
//! product never wraps even for amounts near `u128::MAX`.

use crate::{Amount, LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

mod wide {
    #![allow(clippy::assign_op_pattern)]
    #![allow(clippy::ptr_offset_with_cast)]
    #![allow(clippy::manual_range_contains)]

    uint::construct_uint! {
        /// 256-bit unsigned integer for widened products.
        pub struct U256(4);
    }
}

use wide::U256;

/// Mantissa of 1.0.
pub const ONE_MANTISSA: u128 = 1_000_000_000_000_000_000;

/// Fixed-point ratio, `mantissa / 10^18`.
///
/// Unbounded on construction via [`Ratio::from_mantissa`]. Fees and penalties
/// go through [`Ratio::percent`], which enforces `mantissa <= ONE`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratio(u128);

impl Ratio {
    pub const ZERO: Ratio = Ratio(0);
    pub const ONE: Ratio = Ratio(ONE_MANTISSA);

    pub const fn from_mantissa(mantissa: u128) -> Self {
        Ratio(mantissa)
    }

    /// Ratio bounded to `[0, 1]`.
    pub fn percent(mantissa: u128) -> Result<Self> {
        let ratio = Ratio(mantissa);
        assert_percent(ratio)?;
        Ok(ratio)
    }

    /// `points / 100`, e.g. `from_percent_points(20)` is 0.2.
    pub fn from_percent_points(points: u64) -> Result<Self> {
        let mantissa = (points as u128)
            .checked_mul(ONE_MANTISSA / 100)
            .ok_or_else(|| LedgerError::Overflow("percent points".into()))?;
        Ok(Ratio(mantissa))
    }

    pub const fn mantissa(&self) -> u128 {
        self.0
    }

    pub fn is_percent(&self) -> bool {
        self.0 <= ONE_MANTISSA
    }

    /// `floor(amount * self)`.
    pub fn apply(&self, amount: Amount) -> Result<Amount> {
        mul_div_floor(amount, self.0, ONE_MANTISSA)
    }

    /// `1 - self`. Only defined for percentages.
    pub fn complement(&self) -> Result<Ratio> {
        assert_percent(*self)?;
        Ok(Ratio(ONE_MANTISSA - self.0))
    }
}

impl fmt::Debug for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ratio({self})")
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / ONE_MANTISSA;
        let frac = self.0 % ONE_MANTISSA;
        if frac == 0 {
            return write!(f, "{int}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{int}.{}", digits.trim_end_matches('0'))
    }
}

/// Fails with [`LedgerError::InvalidPercent`] unless `ratio <= 1`.
pub fn assert_percent(ratio: Ratio) -> Result<()> {
    if ratio.0 > ONE_MANTISSA {
        return Err(LedgerError::InvalidPercent);
    }
    Ok(())
}

/// `floor(a * b / denom)` with a 256-bit intermediate.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Result<u128> {
    if denom == 0 {
        return Err(LedgerError::InvalidInput("division by zero".into()));
    }
    // u128 x u128 always fits in 256 bits.
    let num = U256::from(a) * U256::from(b);
    let out = num / U256::from(denom);
    if out.bits() > 128 {
        return Err(LedgerError::Overflow("u128 overflow in mul_div".into()));
    }
    Ok(out.low_u128())
}

pub fn add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b)
        .ok_or_else(|| LedgerError::Overflow("u128 overflow in add".into()))
}

pub fn sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b)
        .ok_or_else(|| LedgerError::Underflow("u128 underflow in sub".into()))
}
