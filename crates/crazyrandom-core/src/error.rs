//! Error types for the crazyrandom generators.

use thiserror::Error;

/// Errors produced while constructing or driving a generator.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw state buffer does not have the length its engine requires.
    #[error("state must be exactly {expected} bits, got {actual}")]
    InvalidState { expected: usize, actual: usize },

    /// An argument is outside the range the operation accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Propagated unchanged from a persistence reader or writer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
