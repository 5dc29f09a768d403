//! Notifications emitted by the engines.
//!
//! Field order in every variant is the order observers rely on.

use crate::decimal::Ratio;
use crate::{Address, Amount};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Staking
    Staked {
        account: Address,
        stake_id: u64,
        amount: Amount,
    },
    Withdrawn {
        account: Address,
        stake_id: u64,
        amount: Amount,
    },
    RewardPoolIncreased {
        owner: Address,
        amount: Amount,
    },
    RewardPoolDecreased {
        owner: Address,
        amount: Amount,
    },
    MinStakeAmountUpdated {
        owner: Address,
        value: Amount,
    },

    // Lockup
    Deposited {
        account: Address,
        deposit_id: u64,
        amount: Amount,
    },
    DepositWithdrawn {
        account: Address,
        deposit_id: u64,
        amount: Amount,
    },

    // Escrow
    OrderCreated {
        id: u128,
        shipper: Address,
        carrier: Address,
        order: Address,
    },
    OrderLocked {
        order: Address,
    },
    OrderUnlocked {
        order: Address,
        penalty: Ratio,
    },
    FeeUpdated {
        fee: Ratio,
    },
    FeeWithdrawed {
        token: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    },

    // Ownership
    OwnerAdded {
        new_owner: Address,
    },
    OwnerRemoved {
        previous_owner: Address,
    },
    OwnerNominated {
        owner: Address,
        nominee: Address,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Staked { .. } => "Staked",
            Event::Withdrawn { .. } => "Withdrawn",
            Event::RewardPoolIncreased { .. } => "RewardPoolIncreased",
            Event::RewardPoolDecreased { .. } => "RewardPoolDecreased",
            Event::MinStakeAmountUpdated { .. } => "MinStakeAmountUpdated",
            Event::Deposited { .. } => "Deposited",
            Event::DepositWithdrawn { .. } => "DepositWithdrawn",
            Event::OrderCreated { .. } => "OrderCreated",
            Event::OrderLocked { .. } => "OrderLocked",
            Event::OrderUnlocked { .. } => "OrderUnlocked",
            Event::FeeUpdated { .. } => "FeeUpdated",
            Event::FeeWithdrawed { .. } => "FeeWithdrawed",
            Event::OwnerAdded { .. } => "OwnerAdded",
            Event::OwnerRemoved { .. } => "OwnerRemoved",
            Event::OwnerNominated { .. } => "OwnerNominated",
            Event::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

/// An event together with the engine address that emitted it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub source: Address,
    pub event: Event,
}

/// Append-only destination for engine events.
///
/// Engines emit only after an operation has fully committed, so a sink never
/// observes events from a rejected operation.
pub trait EventSink {
    fn emit(&mut self, source: Address, event: Event);
}

/// In-memory, append-only event log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    records: Vec<EmittedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EmittedEvent] {
        &self.records
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.records.iter().map(|r| &r.event)
    }

    pub fn last(&self) -> Option<&Event> {
        self.records.last().map(|r| &r.event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands buffered records to a persistent recorder.
    pub fn drain(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.records)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, source: Address, event: Event) {
        self.records.push(EmittedEvent { source, event });
    }
}
