//! Store error types.

use std::path::PathBuf;

use musicdl_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted file exists but cannot be parsed.
    #[error("Corrupt file {}: {message}", path.display())]
    Corrupt {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Invalid value in user input or a persisted file.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// Returns true if the error means the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
