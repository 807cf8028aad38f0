//! Error types for block store operations.

use std::io;
use thiserror::Error;

/// Result type for block store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during block store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another session holds the store.
    #[error("block store locked: another session has exclusive access to {name}")]
    Locked {
        /// Name of the locked store.
        name: String,
    },

    /// The key is not usable as a block name.
    #[error("invalid key {key:?}: keys must be non-empty and use only [A-Za-z0-9_-]")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },
}

impl StorageError {
    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}
