//! Escrow orders with fee and penalty distribution.
//!
//! An order is a content-addressed account: its address is derived from the
//! controller and the order parameters, so funds can be sent to it before the
//! order exists. Creating the order distributes everything held there:
//!
//! - the controller keeps `fee` of the payment-token balance,
//! - the shipper receives `penalty` of the remainder (unlock path only),
//! - the carrier receives the rest,
//! - any fee-token balance is swept to the controller.
//!
//! A locked order cannot be created until an owner unlocks it, which also
//! records the penalty awarded to the shipper.

mod address;
mod controller;
mod distribution;

pub use address::{compute_order_address, OrderParams};
pub use controller::Controller;
pub use distribution::{check_conservation, distribute, Distribution};
