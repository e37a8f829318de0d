//! OTP orchestration: generate-and-store and verify-and-consume

use std::sync::Arc;
use uptime_shared::mask_identifier;

use crate::domain::entities::otp::{OtpPurpose, OtpRecord, VerifyOutcome};
use crate::errors::{DomainError, DomainResult, OtpError};
use crate::repositories::OtpRepository;

use super::engine::OtpEngine;
use super::locks::KeyedLocks;

/// Service issuing and consuming one-time codes
///
/// Holds no per-request state besides the advisory key locks; every decision
/// is made from the record read back from the repository.
pub struct OtpService<R: OtpRepository> {
    /// Record persistence
    repository: Arc<R>,
    /// Generation and validation rules
    engine: OtpEngine,
    /// Serializes calls on the same storage key
    locks: KeyedLocks,
}

impl<R: OtpRepository> OtpService<R> {
    /// Create a new OTP service
    ///
    /// # Arguments
    ///
    /// * `repository` - Where records live between calls
    /// * `engine` - Code length, expiry windows, attempt budget
    pub fn new(repository: Arc<R>, engine: OtpEngine) -> Self {
        Self {
            repository,
            engine,
            locks: KeyedLocks::new(),
        }
    }

    pub fn engine(&self) -> &OtpEngine {
        &self.engine
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Issue a code for `(identifier, purpose)`, replacing any live one
    ///
    /// The plaintext code is returned to the caller for delivery. It is never
    /// logged.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The numeric code
    /// * `Err(DomainError)` - Invalid identifier, generation failure, or store failure
    pub async fn generate_and_save(&self, identifier: &str, purpose: OtpPurpose) -> DomainResult<String> {
        let masked = mask_identifier(identifier);
        let (record, ttl) = self.engine.generate(identifier, purpose)?;

        let key = self.repository.key_for(purpose, identifier);
        let _guard = self.locks.acquire(&key).await;

        self.repository.save(&record, ttl).await.map_err(|e| {
            tracing::error!(
                identifier = %masked,
                purpose = %purpose,
                error = %e,
                event = "otp_storage_failed",
                "Failed to store one-time code"
            );
            e
        })?;

        tracing::info!(
            identifier = %masked,
            purpose = %purpose,
            ttl_secs = ttl.as_secs(),
            event = "otp_generated",
            "Generated one-time code"
        );

        Ok(record.code)
    }

    /// Check `code` against the stored record and consume it on success
    ///
    /// Wrong codes spend one attempt and are written back with the record's
    /// remaining lifetime. Success, exhaustion and expiry delete the record.
    ///
    /// # Returns
    ///
    /// * `Ok(OtpRecord)` - The consumed record (`used == true`)
    /// * `Err(DomainError::Otp(_))` - The verification outcome when it is not a success
    /// * `Err(DomainError)` - Store failure
    pub async fn verify(&self, identifier: &str, purpose: OtpPurpose, code: &str) -> DomainResult<OtpRecord> {
        let masked = mask_identifier(identifier);
        let key = self.repository.key_for(purpose, identifier);
        let _guard = self.locks.acquire(&key).await;

        let mut record = match self.repository.find(purpose, identifier).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(
                    identifier = %masked,
                    purpose = %purpose,
                    event = "otp_not_found",
                    "No one-time code on record"
                );
                return Err(OtpError::NotFound.into());
            }
            Err(e) => {
                tracing::error!(
                    identifier = %masked,
                    purpose = %purpose,
                    error = %e,
                    event = "otp_lookup_failed",
                    "Failed to load one-time code"
                );
                return Err(e);
            }
        };

        let max_attempts = self.engine.max_attempts();
        match self.engine.validate(&mut record, code) {
            VerifyOutcome::Success => {
                self.consume(&record, &masked).await?;
                tracing::info!(
                    identifier = %masked,
                    purpose = %purpose,
                    attempts = record.attempts,
                    event = "otp_verified",
                    "One-time code verified"
                );
                Ok(record)
            }
            VerifyOutcome::InvalidCode => {
                self.repository.update(&record).await.map_err(|e| {
                    tracing::error!(
                        identifier = %masked,
                        purpose = %purpose,
                        error = %e,
                        event = "otp_attempt_persist_failed",
                        "Failed to record verification attempt"
                    );
                    e
                })?;
                let remaining_attempts = record.remaining_attempts(max_attempts);
                tracing::warn!(
                    identifier = %masked,
                    purpose = %purpose,
                    attempts = record.attempts,
                    remaining_attempts,
                    event = "otp_invalid_code",
                    "Invalid one-time code presented"
                );
                Err(OtpError::InvalidCode { remaining_attempts }.into())
            }
            VerifyOutcome::TooManyAttempts => {
                self.consume(&record, &masked).await?;
                tracing::warn!(
                    identifier = %masked,
                    purpose = %purpose,
                    attempts = record.attempts,
                    event = "otp_attempts_exhausted",
                    "One-time code purged after too many attempts"
                );
                Err(OtpError::TooManyAttempts.into())
            }
            VerifyOutcome::Expired => {
                // Best effort; the store TTL removes it anyway.
                if let Err(e) = self.repository.delete(purpose, identifier).await {
                    tracing::warn!(
                        identifier = %masked,
                        purpose = %purpose,
                        error = %e,
                        event = "otp_expired_cleanup_failed",
                        "Failed to delete expired one-time code"
                    );
                }
                tracing::info!(
                    identifier = %masked,
                    purpose = %purpose,
                    event = "otp_expired",
                    "One-time code expired"
                );
                Err(OtpError::Expired.into())
            }
            VerifyOutcome::AlreadyUsed => {
                tracing::warn!(
                    identifier = %masked,
                    purpose = %purpose,
                    event = "otp_reused",
                    "One-time code already used"
                );
                Err(OtpError::AlreadyUsed.into())
            }
        }
    }

    async fn consume(&self, record: &OtpRecord, masked: &str) -> DomainResult<()> {
        self.repository
            .delete(record.purpose, &record.identifier)
            .await
            .map_err(|e: DomainError| {
                tracing::error!(
                    identifier = %masked,
                    purpose = %record.purpose,
                    error = %e,
                    event = "otp_delete_failed",
                    "Failed to delete one-time code"
                );
                e
            })
    }
}
