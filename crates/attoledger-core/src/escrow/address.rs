use crate::decimal::Ratio;
use crate::hash::{sha256_domain, ORDER_ADDRESS_DOMAIN_V1};
use crate::{Address, Hash32};
use serde::{Deserialize, Serialize};

/// Parameters that identify an order. Any change yields a different address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
    pub salt: Hash32,
    pub id: u128,
    pub shipper: Address,
    pub carrier: Address,
    /// Platform fee applied to this order's payment.
    pub fee: Ratio,
}

/// Deterministic order address:
/// last 20 bytes of `H(domain || controller || salt || id || shipper || carrier || fee)`.
///
/// Integers are encoded big-endian at fixed width.
pub fn compute_order_address(controller: &Address, params: &OrderParams) -> Address {
    let mut bytes = Vec::with_capacity(20 + 32 + 16 + 20 + 20 + 16);
    bytes.extend_from_slice(&controller.0);
    bytes.extend_from_slice(&params.salt.0);
    bytes.extend_from_slice(&params.id.to_be_bytes());
    bytes.extend_from_slice(&params.shipper.0);
    bytes.extend_from_slice(&params.carrier.0);
    bytes.extend_from_slice(&params.fee.mantissa().to_be_bytes());
    Address::from_digest(&sha256_domain(ORDER_ADDRESS_DOMAIN_V1, &bytes))
}
