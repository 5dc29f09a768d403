//! IO-bound collaborators for attoledger engines.
//!
//! - [`SystemClock`]: wall-clock [`Clock`].
//! - [`event_log::FileEventRecorder`]: append-only, hash-chained JSONL event log.
//! - [`load_config`]: JSON configuration files.

use attoledger_core::{Clock, LedgerConfig, LedgerError, Result, Timestamp};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod event_log;

pub use event_log::{EventLogRecordV1, FileEventRecorder};

/// Wall-clock time in whole seconds since the Unix epoch.
///
/// A clock set before the epoch reads as 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Reads and validates a JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<LedgerConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::Io(format!("failed to read {}: {e}", path.display())))?;
    LedgerConfig::from_json_str(&raw)
}
