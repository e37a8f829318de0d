//! Domain entities representing core business objects.

pub mod otp;

// Re-export commonly used types
pub use otp::{OtpPurpose, OtpRecord, VerifyOutcome};
