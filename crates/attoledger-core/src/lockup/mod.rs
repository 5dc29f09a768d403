//! Owner lockup: deposits held for a lockup period, then released linearly
//! over a fixed number of unlock intervals.

mod engine;
mod types;

pub use engine::Lockup;
pub use types::{Deposit, DepositId, LockupParams};
