//! Tracing subscriber bootstrap.
//!
//! Engines only emit `tracing` spans and events; binaries and test harnesses
//! call [`init_tracing`] once to decide where they go.

use crate::config::LoggingConfig;
use crate::{LedgerError, Result};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level` when set. Fails instead of
/// panicking if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LedgerError::ConfigError(format!("invalid log filter: {e}")))?,
    };
    let span_events = if config.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events);
    let installed = if config.json_output {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| LedgerError::ConfigError(format!("failed to install tracing subscriber: {e}")))
}
