//! CLI-specific error types. All of these are fatal to the invocation.

use thiserror::Error;

use crate::broadcast::BroadcastError;
use crate::config::ConfigError;
use crate::rules::LoadError;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("rule load failed: {0}")]
    Rules(#[from] LoadError),

    #[error("broadcast server failed: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
