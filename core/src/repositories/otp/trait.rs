//! OTP repository trait defining the persistence contract for one-time codes.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::otp::{OtpPurpose, OtpRecord};
use crate::errors::DomainResult;

/// Namespace shared by every one-time code key
pub const OTP_KEY_PREFIX: &str = "otp";

/// Deterministic storage key for a `(purpose, identifier)` pair
///
/// `otp:<purpose>:<identifier>`; the purpose set is closed, so an identifier
/// containing `:` cannot collide with another purpose's namespace.
pub fn otp_key(purpose: OtpPurpose, identifier: &str) -> String {
    format!("{}:{}:{}", OTP_KEY_PREFIX, purpose.as_str(), identifier)
}

/// Repository trait for OtpRecord persistence
///
/// Implementations are pure marshaling/addressing adapters: they hold no
/// verification rules. At most one record exists per `(purpose, identifier)`;
/// saving a new record replaces the previous one.
///
/// # Errors
/// - `DomainError::Unavailable` when the backing store cannot be reached
/// - `DomainError::Internal` when a stored payload cannot be decoded
/// - `OtpError::Expired` from [`OtpRepository::update`] when the record has
///   no lifetime left
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Persist a freshly generated record, replacing any prior one
    ///
    /// # Arguments
    /// * `record` - The record to store
    /// * `ttl` - Store-level lifetime, normally the purpose's expiry window
    async fn save(&self, record: &OtpRecord, ttl: Duration) -> DomainResult<()>;

    /// Load the record for a `(purpose, identifier)` pair
    ///
    /// # Returns
    /// * `Ok(Some(OtpRecord))` - Record found
    /// * `Ok(None)` - No live record for this pair
    async fn find(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<Option<OtpRecord>>;

    /// Write back a mutated record with its remaining lifetime
    async fn update(&self, record: &OtpRecord) -> DomainResult<()>;

    /// Remove the record for a `(purpose, identifier)` pair
    async fn delete(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<()>;

    /// Storage key used for this pair
    fn key_for(&self, purpose: OtpPurpose, identifier: &str) -> String {
        otp_key(purpose, identifier)
    }
}
