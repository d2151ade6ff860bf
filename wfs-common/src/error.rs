//! Common error types for the workflow service
//!
//! The variants form the closed error taxonomy every component reports
//! through. HTTP mapping lives in `wfs-server`.

use serde_json::Value;
use thiserror::Error;

/// Common result type for workflow service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service-wide error taxonomy
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// State-transition precondition violated (record is not pending)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed request input (blank field, non-object payload, bad body)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// Malformed query input (unknown status, bad timestamp, bad sort field)
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Missing or incorrect write credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Validation error without field details
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Whether the caller may retry the same request and expect a different outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Database(_) | Error::Io(_) => true,
            _ => false,
        }
    }
}

/// SQLite reports writer contention as "database is locked" / "database table is locked"
pub fn is_lock_error(err: &sqlx::Error) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_helper_has_no_details() {
        match Error::validation("source must not be blank") {
            Error::Validation { message, details } => {
                assert_eq!(message, "source must not be blank");
                assert!(details.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_request_errors_are_not_retryable() {
        assert!(!Error::NotFound("x".into()).is_retryable());
        assert!(!Error::Conflict("x".into()).is_retryable());
        assert!(!Error::InvalidFilter("x".into()).is_retryable());
        assert!(!Error::Unauthorized("x".into()).is_retryable());
    }

    #[test]
    fn test_io_errors_are_retryable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::Interrupted, "eintr"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_storage_errors_are_retryable() {
        assert!(Error::Database(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn test_pool_timeout_is_not_a_lock_error() {
        assert!(!is_lock_error(&sqlx::Error::PoolTimedOut));
    }
}
