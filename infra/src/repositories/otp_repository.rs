//! OTP repository persisting records through the cache service
//!
//! Records are stored as JSON under `otp:<purpose>:<identifier>` with the
//! purpose's expiry as TTL. Cache errors are translated here: unavailability
//! becomes `DomainError::Unavailable`, payload problems `DomainError::Internal`.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use uptime_core::domain::entities::otp::{OtpPurpose, OtpRecord};
use uptime_core::errors::{DomainError, DomainResult, OtpError};
use uptime_core::repositories::{otp_key, OtpRepository};
use uptime_shared::mask_identifier;

use crate::cache::{CacheError, CacheService};

/// [`OtpRepository`] over a [`CacheService`]
pub struct CacheOtpRepository {
    cache: Arc<CacheService>,
}

impl CacheOtpRepository {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl OtpRepository for CacheOtpRepository {
    async fn save(&self, record: &OtpRecord, ttl: Duration) -> DomainResult<()> {
        let key = otp_key(record.purpose, &record.identifier);
        self.cache
            .set(&key, record, ttl)
            .await
            .map_err(|e| to_domain_error("save", &record.identifier, e))?;

        debug!(
            identifier = %mask_identifier(&record.identifier),
            purpose = %record.purpose,
            "Stored one-time code record"
        );
        Ok(())
    }

    async fn find(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<Option<OtpRecord>> {
        let key = otp_key(purpose, identifier);
        self.cache
            .get::<OtpRecord>(&key)
            .await
            .map_err(|e| to_domain_error("find", identifier, e))
    }

    async fn update(&self, record: &OtpRecord) -> DomainResult<()> {
        // The store keeps the original TTL; a record with no lifetime left
        // is not written back.
        if record.remaining_ttl_at(Utc::now()).is_none() {
            return Err(OtpError::Expired.into());
        }

        let key = otp_key(record.purpose, &record.identifier);
        match self.cache.update(&key, record).await {
            Ok(()) => Ok(()),
            // Gone between read and write-back: the store TTL ran out.
            Err(CacheError::NotFound { .. }) => Err(OtpError::Expired.into()),
            Err(e) => Err(to_domain_error("update", &record.identifier, e)),
        }
    }

    async fn delete(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<()> {
        let key = otp_key(purpose, identifier);
        self.cache
            .delete(&key)
            .await
            .map(|_| ())
            .map_err(|e| to_domain_error("delete", identifier, e))
    }
}

fn to_domain_error(operation: &'static str, identifier: &str, err: CacheError) -> DomainError {
    error!(
        operation,
        identifier = %mask_identifier(identifier),
        error = %err,
        "OTP repository operation failed"
    );

    if err.is_unavailable() {
        DomainError::Unavailable {
            message: err.to_string(),
        }
    } else {
        DomainError::Internal {
            message: format!("OTP record {} failed: {}", operation, err),
        }
    }
}
