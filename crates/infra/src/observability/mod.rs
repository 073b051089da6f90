//! Structured logging setup
//!
//! `RUST_LOG` wins when set; otherwise the supplied level applies to every
//! target. Output is human-readable or one JSON object per event.

use smartlaunch_domain::{Result, SmartError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber with the default level.
///
/// # Errors
/// Returns `SmartError::Config` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    init_tracing_with_level(DEFAULT_LOG_LEVEL, format)
}

/// Install the global subscriber, falling back to `level` without `RUST_LOG`.
///
/// # Errors
/// Returns `SmartError::Config` if `level` is not a valid filter or a global
/// subscriber is already set.
pub fn init_tracing_with_level(level: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
    };

    installed.map_err(|e| SmartError::Config(format!("Failed to install tracing subscriber: {e}")))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| SmartError::Config(format!("Invalid log filter '{level}': {e}")))
}
