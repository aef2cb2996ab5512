//! Error types for changebus.

use crate::receive::ReceiveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Receive errors
    #[error(transparent)]
    Receive(#[from] ReceiveError),

    // Identifier and routing errors
    #[error("Invalid prefixed ID: {0}")]
    InvalidId(String),

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    // Infrastructure errors
    #[error("Event bus error: {0}")]
    EventBus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if this error is a receive timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Receive(ReceiveError::Timeout))
    }
}
