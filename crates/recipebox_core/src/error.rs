//! Error types for recipebox core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in recipebox core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Block store error.
    #[error("storage error: {0}")]
    Storage(#[from] recipebox_storage::StorageError),

    /// Query engine error (malformed statement, constraint violation, ...).
    #[error("query engine error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine could not be brought to the ready state.
    #[error("initialization failed: {message}")]
    Initialization {
        /// Description of the failure.
        message: String,
    },

    /// A binary image failed the compatibility probe.
    #[error("incompatible database image: {message}")]
    IncompatibleImage {
        /// Description of why the image was rejected.
        message: String,
    },

    /// A structured interchange document is not parseable or has the wrong shape.
    #[error("invalid interchange document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// A stored row holds a value the record mapper cannot represent.
    #[error("invalid value in column {column}: {message}")]
    InvalidRow {
        /// The offending column.
        column: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The engine has not been initialized (or was closed).
    #[error("database not initialized: call ensure_ready() first")]
    NotInitialized,
}

impl CoreError {
    /// Creates an initialization error.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Creates an incompatible image error.
    pub fn incompatible_image(message: impl Into<String>) -> Self {
        Self::IncompatibleImage {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid row error.
    pub fn invalid_row(column: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            column,
            message: message.into(),
        }
    }
}
