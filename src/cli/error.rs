//! CLI error types and conversions

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::orchestrator::ExportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Export error
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Checkpoint error
    #[error("checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// Ledger error
    #[error("ledger error: {0}")]
    LedgerError(#[from] LedgerError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
