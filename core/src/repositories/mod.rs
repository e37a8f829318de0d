pub mod otp;

pub use otp::{otp_key, OtpRepository};

#[cfg(test)]
pub use otp::MockOtpRepository;
