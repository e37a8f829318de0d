//! One-time code configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{var_or, ConfigError};

/// Longest code the generator will produce
pub const MAX_CODE_LENGTH: usize = 12;

/// Longest accepted code lifetime, one year
pub const MAX_EXPIRY_MINUTES: u64 = 365 * 24 * 60;

/// One-time code generation and verification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Number of digits in a generated code
    pub code_length: usize,

    /// Lifetime of password reset codes in minutes
    pub password_reset_expiry_minutes: u64,

    /// Lifetime of email verification codes in minutes
    pub email_verification_expiry_minutes: u64,

    /// Lifetime of phone verification codes in minutes
    pub phone_verification_expiry_minutes: u64,

    /// Verification calls allowed per code
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            password_reset_expiry_minutes: 15,
            email_verification_expiry_minutes: 30,
            phone_verification_expiry_minutes: 15,
            max_attempts: 3,
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            code_length: var_or(&lookup, "OTP_LENGTH", defaults.code_length),
            password_reset_expiry_minutes: var_or(
                &lookup,
                "OTP_EXPIRY_PASSWORD_RESET_MINUTES",
                defaults.password_reset_expiry_minutes,
            ),
            email_verification_expiry_minutes: var_or(
                &lookup,
                "OTP_EXPIRY_EMAIL_VERIFICATION_MINUTES",
                defaults.email_verification_expiry_minutes,
            ),
            phone_verification_expiry_minutes: var_or(
                &lookup,
                "OTP_EXPIRY_PHONE_VERIFICATION_MINUTES",
                defaults.phone_verification_expiry_minutes,
            ),
            max_attempts: var_or(&lookup, "OTP_MAX_ATTEMPTS", defaults.max_attempts),
        }
    }

    pub fn password_reset_expiry(&self) -> Duration {
        minutes_to_duration(self.password_reset_expiry_minutes)
    }

    pub fn email_verification_expiry(&self) -> Duration {
        minutes_to_duration(self.email_verification_expiry_minutes)
    }

    pub fn phone_verification_expiry(&self) -> Duration {
        minutes_to_duration(self.phone_verification_expiry_minutes)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_length == 0 || self.code_length > MAX_CODE_LENGTH {
            return Err(ConfigError::invalid(
                "OTP_LENGTH",
                format!("code length must be between 1 and {}", MAX_CODE_LENGTH),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "OTP_MAX_ATTEMPTS",
                "at least one attempt must be allowed",
            ));
        }
        let expiries = [
            ("OTP_EXPIRY_PASSWORD_RESET_MINUTES", self.password_reset_expiry_minutes),
            ("OTP_EXPIRY_EMAIL_VERIFICATION_MINUTES", self.email_verification_expiry_minutes),
            ("OTP_EXPIRY_PHONE_VERIFICATION_MINUTES", self.phone_verification_expiry_minutes),
        ];
        for (field, minutes) in expiries {
            if minutes == 0 {
                return Err(ConfigError::invalid(field, "expiry must be positive"));
            }
            if minutes > MAX_EXPIRY_MINUTES {
                return Err(ConfigError::invalid(
                    field,
                    format!("expiry must be at most {} minutes", MAX_EXPIRY_MINUTES),
                ));
            }
        }
        Ok(())
    }
}

/// Saturates instead of overflowing; out-of-range values are rejected by `validate`
fn minutes_to_duration(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_config_default() {
        let config = OtpConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.password_reset_expiry(), Duration::from_secs(15 * 60));
        assert_eq!(config.email_verification_expiry(), Duration::from_secs(30 * 60));
        assert_eq!(config.phone_verification_expiry(), Duration::from_secs(15 * 60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_otp_config_from_vars() {
        let config = OtpConfig::from_vars(|key| match key {
            "OTP_LENGTH" => Some("8".to_string()),
            "OTP_MAX_ATTEMPTS" => Some("5".to_string()),
            "OTP_EXPIRY_PHONE_VERIFICATION_MINUTES" => Some("oops".to_string()),
            _ => None,
        });

        assert_eq!(config.code_length, 8);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.phone_verification_expiry_minutes, 15);
    }

    #[test]
    fn test_otp_config_validation() {
        let mut config = OtpConfig::default();
        config.code_length = 0;
        assert!(config.validate().is_err());

        config.code_length = MAX_CODE_LENGTH + 1;
        assert!(config.validate().is_err());

        let mut config = OtpConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = OtpConfig::default();
        config.email_verification_expiry_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expiry_upper_bound() {
        let mut config = OtpConfig::default();
        config.password_reset_expiry_minutes = MAX_EXPIRY_MINUTES;
        assert!(config.validate().is_ok());

        config.password_reset_expiry_minutes = MAX_EXPIRY_MINUTES + 1;
        assert!(config.validate().is_err());

        config.password_reset_expiry_minutes = u64::MAX / 30;
        assert!(config.validate().is_err());
        assert_eq!(config.password_reset_expiry(), Duration::from_secs(u64::MAX));
    }
}
