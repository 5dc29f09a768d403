//! Staking pools with linear reward vesting.
//!
//! Two pool variants share one engine:
//! - interval pools vest `amount * (100 + revenue) / 100` linearly over
//!   `intervals_count` intervals and cap total principal at `size`,
//! - monthly pools pay `amount + amount * revenue / 100` in one lump after a
//!   single interval and allow one outstanding stake per account.
//!
//! Design goals:
//! - the pool never promises more reward than it holds,
//! - withdrawals split exactly into principal and reward, with no dust left
//!   after the final one,
//! - IO-free: tokens move through a [`crate::TokenLedger`], time is an argument.

pub mod invariants;
pub mod math;
pub mod pool;
pub mod types;

pub use invariants::{check_invariants, InvariantId, InvariantViolation};
pub use pool::StakingPool;
pub use types::{PoolKind, Stake, StakeId, StakeStatus, StakingParams};
