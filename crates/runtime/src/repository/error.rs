//! Error types raised by result store implementations.

use thiserror::Error;

/// Errors surfaced by result store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("identifier {identifier} has already played")]
    DuplicateIdentifier { identifier: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
