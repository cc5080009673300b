//! Error types for repodock

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for repodock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Rejections of operator requests, returned before anything is enqueued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Missing or malformed field
    #[error("{0}")]
    InvalidInput(String),

    /// The derived repository name is already taken on disk
    #[error("There is already a folder named \"{name}\" in {}.", .root.display())]
    NameConflict {
        /// Repository name derived from the request
        name: String,
        /// Repository root that holds the conflicting folder
        root: PathBuf,
    },

    /// Attempted access outside the permitted directory
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),
}

/// Error type for repodock operations
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected by validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Job queue or catalog backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns the validation rejection, if this error is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}
