//! # Uptime Core
//!
//! Domain layer for one-time codes: the record entity, the error taxonomy,
//! the repository contract and the services that issue and consume codes.
//! Storage adapters live in `uptime_infra`.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::{OtpPurpose, OtpRecord, VerifyOutcome};
pub use errors::{DomainError, DomainResult, OtpError};
pub use repositories::{otp_key, OtpRepository};
pub use services::{OtpEngine, OtpService};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_exports() {
        let err: DomainError = OtpError::NotFound.into();
        assert_eq!(err.as_otp(), Some(&OtpError::NotFound));
        assert_eq!(
            otp_key(OtpPurpose::PhoneVerification, "+15550100"),
            "otp:phone_verification:+15550100"
        );
        let engine = OtpEngine::new(Default::default());
        assert_eq!(engine.max_attempts(), 3);
    }
}
