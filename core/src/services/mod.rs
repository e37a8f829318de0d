//! Business services containing domain logic and use cases.

pub mod otp;

pub use otp::{OtpEngine, OtpService};
