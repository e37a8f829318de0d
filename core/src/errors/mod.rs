//! Domain-specific error types and error handling.

mod types;

// Re-export all error types
pub use types::OtpError;

use thiserror::Error;

/// Core domain errors (general purpose)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// The backing store cannot be reached (circuit open, transport failure, timeout)
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Otp(#[from] OtpError),
}

impl DomainError {
    /// The one-time code outcome carried by this error, if any
    pub fn as_otp(&self) -> Option<&OtpError> {
        match self {
            DomainError::Otp(err) => Some(err),
            _ => None,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Unavailable { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
