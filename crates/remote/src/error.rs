//! Remote Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A remote service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Credentials were missing or rejected.
    #[display("authentication failed for user {_0:?}")]
    Authentication(#[error(not(source))] Option<String>),
    /// Entity (project, container, or parent) does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied to an existing entity.
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Entity name is empty, reserved, or contains a separator.
    #[display("invalid name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (connection reset, timeout, throttling)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Service-specific error
    #[display("service error: {_0}")]
    ServiceError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::ServiceError(_))
    }
}
