//! Error types for CLI operations.

use thiserror::Error;

/// Failures of the `run` pipeline
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A run precondition or per-anchor contract failed
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// Sources could not be opened
    #[error(transparent)]
    Ingestion(#[from] ingestion::IngestionError),

    /// Output sinks could not be created
    #[error(transparent)]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// The dispatcher stopped accepting composites
    #[error("dispatcher closed before composite {anchor} was delivered")]
    DispatcherClosed { anchor: usize },

    /// A worker task panicked or was cancelled
    #[error("anchor worker failed: {message}")]
    Worker { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
