//! One-time code issuance and verification
//!
//! - [`OtpEngine`]: pure rules for generating and checking codes
//! - [`OtpService`]: persistence workflow over an [`OtpRepository`](crate::repositories::OtpRepository)

mod engine;
mod locks;
mod service;

#[cfg(test)]
mod tests;

pub use engine::OtpEngine;
pub use service::OtpService;
