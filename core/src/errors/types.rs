//! Domain-specific error types for one-time code operations
//!
//! Every variant is an expected, user-facing outcome. Callers branch on the
//! variant (or on [`OtpError::code`]) rather than on the message text.

use thiserror::Error;

/// One-time code verification and generation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("One-time code not found")]
    NotFound,

    #[error("Invalid one-time code, {remaining_attempts} attempt(s) remaining")]
    InvalidCode { remaining_attempts: u32 },

    #[error("One-time code expired")]
    Expired,

    #[error("One-time code already used")]
    AlreadyUsed,

    #[error("Too many verification attempts, please request a new code")]
    TooManyAttempts,

    #[error("Unsupported one-time code purpose: {purpose}")]
    UnsupportedPurpose { purpose: String },

    #[error("Failed to generate one-time code: {message}")]
    CodeGeneration { message: String },
}

impl OtpError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            OtpError::NotFound => "OTP_NOT_FOUND",
            OtpError::InvalidCode { .. } => "OTP_INVALID_CODE",
            OtpError::Expired => "OTP_EXPIRED",
            OtpError::AlreadyUsed => "OTP_ALREADY_USED",
            OtpError::TooManyAttempts => "OTP_TOO_MANY_ATTEMPTS",
            OtpError::UnsupportedPurpose { .. } => "OTP_UNSUPPORTED_PURPOSE",
            OtpError::CodeGeneration { .. } => "OTP_CODE_GENERATION_FAILED",
        }
    }

    /// Whether the code this error refers to can never verify again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OtpError::NotFound | OtpError::Expired | OtpError::AlreadyUsed | OtpError::TooManyAttempts
        )
    }
}
