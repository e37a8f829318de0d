//! One-time code entity bound to an identifier and a purpose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::OtpError;

/// Closed set of reasons a one-time code can be issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    PasswordReset,
    EmailVerification,
    PhoneVerification,
}

impl OtpPurpose {
    pub const ALL: [OtpPurpose; 3] = [
        OtpPurpose::PasswordReset,
        OtpPurpose::EmailVerification,
        OtpPurpose::PhoneVerification,
    ];

    /// Wire name, also used as the storage key namespace
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::PasswordReset => "password_reset",
            OtpPurpose::EmailVerification => "email_verification",
            OtpPurpose::PhoneVerification => "phone_verification",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpPurpose {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OtpPurpose::ALL
            .into_iter()
            .find(|purpose| purpose.as_str() == s)
            .ok_or_else(|| OtpError::UnsupportedPurpose {
                purpose: s.to_string(),
            })
    }
}

/// A one-time code as persisted between verification calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// The numeric secret
    pub code: String,

    /// Subject the code is bound to (e-mail address, phone number, handle)
    pub identifier: String,

    /// Why the code was issued
    pub purpose: OtpPurpose,

    /// Codes are dead on or after this instant
    pub expires_at: DateTime<Utc>,

    /// Set once, by the verification call that succeeds
    pub used: bool,

    /// Verification calls that reached the code comparison
    pub attempts: u32,

    /// Informational only
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Whether the code is dead at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the attempt budget is spent
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.attempts >= max_attempts
    }

    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }

    /// Time left before expiry at `now`, `None` once expired
    pub fn remaining_ttl_at(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|ttl| !ttl.is_zero())
    }
}

/// Result of checking a presented code against a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Success,
    InvalidCode,
    Expired,
    AlreadyUsed,
    TooManyAttempts,
}

impl VerifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VerifyOutcome::Success)
    }
}
