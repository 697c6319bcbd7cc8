//! Logging bootstrap
//!
//! Installs the global `tracing` subscriber exactly once per process.
//! `RUST_LOG` wins over the configured level when set. Output goes to stderr
//! so that `--format json` stdout stays machine-readable.

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

static LOGGING_LEVEL: OnceCell<String> = OnceCell::new();

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log level `{level}`: {reason}")]
    InvalidLevel { level: String, reason: String },
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Initialize logging. Repeated calls are no-ops.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    if LOGGING_LEVEL.get().is_some() {
        return Ok(());
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|err| LoggingError::InvalidLevel {
            level: level.to_string(),
            reason: err.to_string(),
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))?;

    let _ = LOGGING_LEVEL.set(level.to_string());
    Ok(())
}
