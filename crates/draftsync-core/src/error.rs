//! Error types for draftsync-core

use thiserror::Error;

/// Result type alias using draftsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in draftsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Device-local persistence failure (quota exceeded, storage disabled)
    #[error("Local storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
