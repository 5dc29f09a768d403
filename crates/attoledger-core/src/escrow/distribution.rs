use crate::decimal::{add, assert_percent, sub, Ratio};
use crate::{Amount, LedgerError, Result};

/// Split of an order's payment-token balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
    pub controller: Amount,
    pub shipper: Amount,
    pub carrier: Amount,
}

impl Distribution {
    pub fn total(&self) -> Result<Amount> {
        add(add(self.controller, self.shipper)?, self.carrier)
    }
}

/// Splits `payment` between controller, shipper and carrier.
///
/// Invariant: `controller + shipper + carrier == payment`. Flooring dust
/// always lands with the carrier.
pub fn distribute(payment: Amount, fee: Ratio, penalty: Option<Ratio>) -> Result<Distribution> {
    assert_percent(fee)?;
    let controller = fee.apply(payment)?;
    let remaining = sub(payment, controller)?;
    let shipper = match penalty {
        Some(penalty) => {
            assert_percent(penalty)?;
            penalty.apply(remaining)?
        }
        None => 0,
    };
    let carrier = sub(remaining, shipper)?;
    let dist = Distribution {
        controller,
        shipper,
        carrier,
    };
    check_conservation(payment, &dist)?;
    Ok(dist)
}

/// Fails unless the three shares add up to exactly `payment`.
pub fn check_conservation(payment: Amount, dist: &Distribution) -> Result<()> {
    let total = dist.total()?;
    if total != payment {
        return Err(LedgerError::InvariantViolated(format!(
            "distributed {total} of payment {payment}"
        )));
    }
    Ok(())
}
