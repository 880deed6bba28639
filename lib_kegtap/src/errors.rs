//! # Error Taxonomy
//!
//! A single error enum shared by the ledger store, the HTTP surface and the device
//! runtime. Each variant maps onto one way a tap operation can fail, and the server
//! maps each onto one HTTP status class.

use thiserror::Error;

/// Errors raised by tap, beer and pour operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TapError {
    /// The referenced tap or beer does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A required field is missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),
    /// A device-to-server call failed (connection refused, timeout, unexpected status).
    #[error("Network failure: {0}")]
    TransientNetwork(String),
    /// The backing store is unavailable or rejected the statement.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

/// Convenience alias used throughout the workspace.
pub type TapResult<T> = Result<T, TapError>;

impl TapError {
    /// The canonical "tap not found" error, worded the way API clients expect it.
    pub fn tap_not_found() -> Self {
        TapError::NotFound("Tap not found".to_string())
    }

    /// The canonical "beer not found" error.
    pub fn beer_not_found() -> Self {
        TapError::NotFound("Beer not found".to_string())
    }

    /// Shorthand for building an `InvalidRequest` from any string-like message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        TapError::InvalidRequest(msg.into())
    }
}

#[cfg(feature = "connections")]
impl From<sqlx::Error> for TapError {
    fn from(e: sqlx::Error) -> Self {
        TapError::Persistence(e.to_string())
    }
}
