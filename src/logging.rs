//! Logging setup for binaries embedding the crate.
//!
//! The library only emits `tracing` events. Load and save failures are
//! reported at `warn`/`error`, dropped elements and default substitutions at
//! `debug`.

use crate::error::ConfigError;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CONFNODE_LOG";

/// Installs a stderr subscriber. `CONFNODE_LOG` wins over `level`, which defaults to `warn`.
pub fn init_logging(level: Option<&str>) -> Result<(), ConfigError> {
    let filter = build_env_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}

fn build_env_filter(level: Option<&str>) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(level.unwrap_or("warn")).map_err(|e| ConfigError::Logging(e.to_string()))
}
