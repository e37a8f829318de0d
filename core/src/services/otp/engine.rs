//! Pure one-time code rules: generation and validation, no I/O.

use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use rand::{rngs::OsRng, RngCore};
use std::time::Duration;

use uptime_shared::config::OtpConfig;

use crate::domain::entities::otp::{OtpPurpose, OtpRecord, VerifyOutcome};
use crate::errors::{DomainError, DomainResult, OtpError};

/// Decision logic for one-time codes
///
/// The engine never touches a store. [`OtpEngine::validate`] mutates the
/// record it is given; persisting that mutation is the caller's job.
#[derive(Debug, Clone)]
pub struct OtpEngine {
    config: OtpConfig,
}

impl OtpEngine {
    pub fn new(config: OtpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Lifetime of a code issued for `purpose`
    pub fn expiry_for(&self, purpose: OtpPurpose) -> Duration {
        match purpose {
            OtpPurpose::PasswordReset => self.config.password_reset_expiry(),
            OtpPurpose::EmailVerification => self.config.email_verification_expiry(),
            OtpPurpose::PhoneVerification => self.config.phone_verification_expiry(),
        }
    }

    /// Create a fresh record and the TTL it should be stored with
    pub fn generate(&self, identifier: &str, purpose: OtpPurpose) -> DomainResult<(OtpRecord, Duration)> {
        self.generate_at(identifier, purpose, Utc::now())
    }

    pub fn generate_at(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> DomainResult<(OtpRecord, Duration)> {
        if identifier.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "identifier must not be empty".to_string(),
            });
        }

        let ttl = self.expiry_for(purpose);
        let lifetime = chrono::Duration::from_std(ttl).map_err(|e| DomainError::Internal {
            message: format!("expiry for {} out of range: {}", purpose, e),
        })?;
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| DomainError::Internal {
            message: format!("expiry for {} out of range", purpose),
        })?;
        let code = generate_numeric_code(self.config.code_length)?;

        let record = OtpRecord {
            code,
            identifier: identifier.to_string(),
            purpose,
            expires_at,
            used: false,
            attempts: 0,
            created_at: now,
        };

        Ok((record, ttl))
    }

    /// Check `presented` against `record`, mutating attempts and the used flag
    pub fn validate(&self, record: &mut OtpRecord, presented: &str) -> VerifyOutcome {
        self.validate_at(record, presented, Utc::now())
    }

    /// Expiry and used state are checked before an attempt is consumed, so
    /// attempts are only spent on live, unused codes.
    pub fn validate_at(&self, record: &mut OtpRecord, presented: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let max_attempts = self.config.max_attempts;

        if record.is_expired_at(now) {
            return VerifyOutcome::Expired;
        }
        if record.used {
            return VerifyOutcome::AlreadyUsed;
        }
        if record.is_exhausted(max_attempts) {
            return VerifyOutcome::TooManyAttempts;
        }

        record.attempts += 1;

        if !constant_time_eq(presented.as_bytes(), record.code.as_bytes()) {
            if record.is_exhausted(max_attempts) {
                return VerifyOutcome::TooManyAttempts;
            }
            return VerifyOutcome::InvalidCode;
        }

        record.used = true;
        VerifyOutcome::Success
    }
}

/// Draw `length` digits from the OS random source, each uniform over 0-9
pub(crate) fn generate_numeric_code(length: usize) -> Result<String, OtpError> {
    if length == 0 {
        return Err(OtpError::CodeGeneration {
            message: "code length must be positive".to_string(),
        });
    }

    let mut code = String::with_capacity(length);
    let mut buf = [0u8; 16];
    while code.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| OtpError::CodeGeneration { message: e.to_string() })?;
        // 250 is the largest multiple of 10 that fits a byte; rejecting the
        // rest keeps every digit equally likely.
        for byte in buf.iter().copied().filter(|b| *b < 250) {
            if code.len() == length {
                break;
            }
            code.push(char::from(b'0' + byte % 10));
        }
    }

    Ok(code)
}
