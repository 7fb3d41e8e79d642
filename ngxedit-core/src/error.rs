//! Error types for ngxedit

use thiserror::Error;

/// Result type for ngxedit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ngxedit
#[derive(Error, Debug)]
pub enum Error {
    /// A query or mutation referenced a key that is not in the document
    #[error("Not found: {0}")]
    NotFound(String),

    /// The configuration text violates the supported grammar
    #[error("Malformed config: {0}")]
    Malformed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
