//! attoledger core: deterministic fixed-point accounting engines.
//!
//! The crate models three on-chain accounting systems as plain in-process
//! state machines:
//!
//! - [`staking::StakingPool`]: interval and monthly staking pools with linear
//!   vesting and a shared reward reserve,
//! - [`lockup::Lockup`]: owner deposits released linearly after a lockup,
//! - [`escrow::Controller`]: content-addressed escrow orders with fee and
//!   penalty distribution.
//!
//! The chain itself is an external collaborator. Token balances live behind
//! [`token::TokenLedger`], time is passed explicitly (see [`clock::Clock`]),
//! and notifications are appended to an [`events::EventSink`].
//!
//! Every division floors. Every add and sub is checked. Every mutating
//! operation validates and computes its post-state before it touches state.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod access;
pub mod clock;
pub mod config;
pub mod decimal;
pub mod escrow;
pub mod events;
pub mod hash;
pub mod lockup;
pub mod observability;
pub mod staking;
pub mod token;

pub use access::{MultiOwnable, TwoStageOwnable};
pub use clock::{Clock, ManualClock};
pub use config::LedgerConfig;
pub use decimal::Ratio;
pub use events::{Event, EventLog, EventSink};
pub use token::{InMemoryTokenLedger, TokenLedger};

/// Token amount in base units.
pub type Amount = u128;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds in one week.
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;

// =============================================================================
// Identifiers
// =============================================================================

/// 20-byte account or contract identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address. Never a valid recipient or order.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Deterministic address for a human-readable label.
    ///
    /// Takes the last 20 bytes of a domain-separated SHA-256, the same
    /// truncation used for order addresses.
    pub fn from_label(label: &str) -> Self {
        let digest = hash::sha256_domain(hash::ADDRESS_LABEL_DOMAIN_V1, label.as_bytes());
        Self::from_digest(&digest)
    }

    /// Last 20 bytes of a 32-byte digest.
    pub fn from_digest(digest: &Hash32) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.0[12..]);
        Address(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| LedgerError::InvalidInput(format!("invalid address hex: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidInput("address must be 20 bytes".into()))?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte digest (salts, record hashes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(raw).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))?;
        Ok(Hash32(bytes))
    }
}

// =============================================================================
// Execution environment
// =============================================================================

/// Collaborators a mutating engine operation runs against.
pub struct Env<'a> {
    pub ledger: &'a mut dyn TokenLedger,
    pub events: &'a mut dyn EventSink,
}

impl<'a> Env<'a> {
    pub fn new(ledger: &'a mut dyn TokenLedger, events: &'a mut dyn EventSink) -> Self {
        Self { ledger, events }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Coarse classification of [`LedgerError`] for callers that only need to
/// know which kind of precondition failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    AccessControl,
    Validation,
    StateConflict,
    InsufficientResource,
    Arithmetic,
    Configuration,
}

/// Unified error type for attoledger operations.
///
/// Display strings are the fixed rejection reasons observed by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // Access control
    #[error("Not owner")]
    NotOwner,

    #[error("Not nominated owner")]
    NotNominated,

    #[error("Already owner")]
    AlreadyOwner,

    #[error("Already nominated")]
    AlreadyNominated,

    #[error("Owners array is empty")]
    OwnersRequired,

    #[error("Must be at least one owner")]
    MustHaveOneOwner,

    // Input validation
    #[error("Amount not positive")]
    AmountNotPositive,

    #[error("Amount lt minimum stake")]
    AmountBelowMinimum,

    #[error("Invalid percent value")]
    InvalidPercent,

    #[error("{0} is zero address")]
    ZeroAddress(&'static str),

    #[error("{0} not positive")]
    NotPositive(&'static str),

    #[error("Invalid stake id")]
    InvalidStakeId,

    #[error("Invalid deposit id")]
    InvalidDepositId,

    #[error("Invalid order address")]
    AddressMismatch,

    #[error("Fee token equals payment token")]
    IdenticalTokens,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // State conflicts
    #[error("Previous stake is not over")]
    PreviousStakeNotOver,

    #[error("Order locked")]
    OrderLocked,

    #[error("Order not locked")]
    NotLocked,

    #[error("Order already created")]
    AlreadyCreated,

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    // Insufficient resources
    #[error("Amount gt free size")]
    CapacityExceeded,

    #[error("Not enough rewards")]
    NotEnoughRewards,

    #[error("Not enough available tokens")]
    InsufficientAvailable,

    #[error("No tokens to decrease")]
    NoTokensToDecrease,

    #[error("Not enough amount")]
    InsufficientPoolReserve,

    #[error("No enough fees")]
    InsufficientFees,

    #[error("Transfer amount exceeds balance")]
    InsufficientBalance,

    #[error("Transfer amount exceeds allowance")]
    InsufficientAllowance,

    // Arithmetic
    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("Underflow: {0}")]
    Underflow(String),

    // Configuration and IO
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        use LedgerError::*;
        match self {
            NotOwner | NotNominated | AlreadyOwner | AlreadyNominated | OwnersRequired
            | MustHaveOneOwner => ErrorCategory::AccessControl,
            AmountNotPositive | AmountBelowMinimum | InvalidPercent | ZeroAddress(_)
            | NotPositive(_) | InvalidStakeId | InvalidDepositId | AddressMismatch
            | IdenticalTokens | InvalidInput(_) => ErrorCategory::Validation,
            PreviousStakeNotOver | OrderLocked | NotLocked | AlreadyCreated
            | InvariantViolated(_) => ErrorCategory::StateConflict,
            CapacityExceeded | NotEnoughRewards | InsufficientAvailable | NoTokensToDecrease
            | InsufficientPoolReserve | InsufficientFees | InsufficientBalance
            | InsufficientAllowance => ErrorCategory::InsufficientResource,
            Overflow(_) | Underflow(_) => ErrorCategory::Arithmetic,
            ConfigError(_) | Io(_) => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
