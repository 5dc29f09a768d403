//! Configuration management for attoledger.
//!
//! Provides structured configuration with validation for every engine.
//!
//! # Configuration Sources
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with `ATTOLEDGER_`)
//! - JSON documents ([`LedgerConfig::from_json_str`])
//! - Programmatic defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use attoledger_core::config::LedgerConfig;
//!
//! let config = LedgerConfig::builder()
//!     .staking_revenue(20)
//!     .escrow_fee_percent(5)
//!     .build()?;
//! let params = config.staking.params()?;
//! ```

use crate::decimal::Ratio;
use crate::lockup::LockupParams;
use crate::staking::StakingParams;
use crate::{Amount, LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Complete attoledger configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Interval staking pool.
    pub staking: StakingConfig,

    /// Monthly staking pool.
    pub monthly: MonthlyStakingConfig,

    /// Owner lockup.
    pub lockup: LockupConfig,

    /// Escrow controller.
    pub escrow: EscrowConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl LedgerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> LedgerConfigBuilder {
        LedgerConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration document. Missing sections
    /// take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Looks for variables prefixed with `ATTOLEDGER_`:
    /// - `ATTOLEDGER_STAKING_REVENUE` - Interval pool revenue in percent
    /// - `ATTOLEDGER_STAKING_INTERVALS_COUNT` - Interval pool vesting intervals
    /// - `ATTOLEDGER_STAKING_INTERVAL_DAYS` - Interval pool interval length in days
    /// - `ATTOLEDGER_STAKING_SIZE` - Interval pool principal capacity
    /// - `ATTOLEDGER_MONTHLY_REVENUE` - Monthly pool revenue in percent
    /// - `ATTOLEDGER_MONTHLY_INTERVAL_DAYS` - Monthly pool interval length in days
    /// - `ATTOLEDGER_ESCROW_FEE_MANTISSA` - Platform fee, 18-decimal mantissa
    /// - `ATTOLEDGER_LOG_LEVEL` - Logging level (trace, debug, info, warn, error)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<u64>("ATTOLEDGER_STAKING_REVENUE")? {
            config.staking.revenue = v;
        }
        if let Some(v) = env_parse::<u64>("ATTOLEDGER_STAKING_INTERVALS_COUNT")? {
            config.staking.intervals_count = v;
        }
        if let Some(v) = env_parse::<u64>("ATTOLEDGER_STAKING_INTERVAL_DAYS")? {
            config.staking.interval_duration_days = v;
        }
        if let Some(v) = env_parse::<Amount>("ATTOLEDGER_STAKING_SIZE")? {
            config.staking.size = v;
        }
        if let Some(v) = env_parse::<u64>("ATTOLEDGER_MONTHLY_REVENUE")? {
            config.monthly.revenue = v;
        }
        if let Some(v) = env_parse::<u64>("ATTOLEDGER_MONTHLY_INTERVAL_DAYS")? {
            config.monthly.interval_duration_days = v;
        }
        if let Some(v) = env_parse::<u128>("ATTOLEDGER_ESCROW_FEE_MANTISSA")? {
            config.escrow.fee_mantissa = v;
        }
        if let Ok(level) = std::env::var("ATTOLEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.staking
            .params()
            .map_err(|e| LedgerError::ConfigError(format!("staking: {e}")))?;
        self.monthly
            .params()
            .map_err(|e| LedgerError::ConfigError(format!("monthly: {e}")))?;
        self.lockup
            .params()
            .map_err(|e| LedgerError::ConfigError(format!("lockup: {e}")))?;
        self.escrow
            .fee()
            .map_err(|e| LedgerError::ConfigError(format!("escrow: {e}")))?;

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(LedgerError::ConfigError(format!(
                "unknown log level: {}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| LedgerError::ConfigError(format!("Invalid {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Interval staking pool configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Total yield in whole percent.
    pub revenue: u64,

    /// Number of vesting intervals.
    pub intervals_count: u64,

    /// Length of one interval in days.
    pub interval_duration_days: u64,

    /// Maximum outstanding principal.
    pub size: Amount,
}

impl StakingConfig {
    pub fn params(&self) -> Result<StakingParams> {
        StakingParams::interval(
            self.revenue,
            self.intervals_count,
            self.interval_duration_days,
            self.size,
        )
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            revenue: 15,
            intervals_count: 5,
            interval_duration_days: 100,
            size: 1_000_000_000_000_000_000_000_000_000, // 1e27
        }
    }
}

/// Monthly staking pool configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthlyStakingConfig {
    pub revenue: u64,
    pub interval_duration_days: u64,
}

impl MonthlyStakingConfig {
    pub fn params(&self) -> Result<StakingParams> {
        StakingParams::monthly(self.revenue, self.interval_duration_days)
    }
}

impl Default for MonthlyStakingConfig {
    fn default() -> Self {
        Self {
            revenue: 15,
            interval_duration_days: 100,
        }
    }
}

/// Lockup configuration. Durations are in weeks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockupConfig {
    pub lockup_duration_weeks: u64,
    pub unlock_duration_weeks: u64,
    pub unlock_intervals_count: u64,
}

impl LockupConfig {
    pub fn params(&self) -> Result<LockupParams> {
        LockupParams::new(
            self.lockup_duration_weeks,
            self.unlock_duration_weeks,
            self.unlock_intervals_count,
        )
    }
}

impl Default for LockupConfig {
    fn default() -> Self {
        Self {
            lockup_duration_weeks: 100,
            unlock_duration_weeks: 500,
            unlock_intervals_count: 5,
        }
    }
}

/// Escrow controller configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Platform fee as an 18-decimal mantissa, at most `10^18`.
    pub fee_mantissa: u128,
}

impl EscrowConfig {
    pub fn fee(&self) -> Result<Ratio> {
        Ratio::percent(self.fee_mantissa)
    }
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            fee_mantissa: 100_000_000_000_000_000, // 10%
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Whether to include span context in logs.
    pub include_spans: bool,

    /// JSON output format.
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            include_spans: true,
            json_output: false,
        }
    }
}

/// Builder for LedgerConfig.
#[derive(Default)]
pub struct LedgerConfigBuilder {
    config: LedgerConfig,
    /// First setter failure, reported by `build`.
    error: Option<LedgerError>,
}

impl LedgerConfigBuilder {
    pub fn staking_revenue(mut self, revenue: u64) -> Self {
        self.config.staking.revenue = revenue;
        self
    }

    pub fn staking_intervals(mut self, count: u64, duration_days: u64) -> Self {
        self.config.staking.intervals_count = count;
        self.config.staking.interval_duration_days = duration_days;
        self
    }

    pub fn staking_size(mut self, size: Amount) -> Self {
        self.config.staking.size = size;
        self
    }

    pub fn monthly(mut self, revenue: u64, duration_days: u64) -> Self {
        self.config.monthly.revenue = revenue;
        self.config.monthly.interval_duration_days = duration_days;
        self
    }

    pub fn lockup(mut self, lockup_weeks: u64, unlock_weeks: u64, intervals: u64) -> Self {
        self.config.lockup = LockupConfig {
            lockup_duration_weeks: lockup_weeks,
            unlock_duration_weeks: unlock_weeks,
            unlock_intervals_count: intervals,
        };
        self
    }

    /// Set the escrow fee in whole percent.
    pub fn escrow_fee_percent(mut self, points: u64) -> Self {
        match Ratio::from_percent_points(points) {
            Ok(fee) => self.config.escrow.fee_mantissa = fee.mantissa(),
            Err(e) => {
                self.error
                    .get_or_insert(LedgerError::ConfigError(format!("escrow: {e}")));
            }
        }
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Enable JSON log output.
    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.config.logging.json_output = enabled;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<LedgerConfig> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.config.validate()?;
        Ok(self.config)
    }
}
