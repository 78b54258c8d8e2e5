//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Frame manifest could not be read or parsed
    #[error("invalid frame manifest {path}: {message}")]
    Manifest {
        /// Manifest path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Recording header could not be read or parsed
    #[error("invalid recording header {path}: {message}")]
    Header {
        /// Header path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// File read failure
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Collaborator contract violation
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl IngestionError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn header(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Header {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
