//! Mock implementation of OtpRepository for testing

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::entities::otp::{OtpPurpose, OtpRecord};
use crate::errors::{DomainError, DomainResult, OtpError};

use super::r#trait::{otp_key, OtpRepository};

/// Mock OTP repository for testing
pub struct MockOtpRepository {
    records: Arc<RwLock<HashMap<String, (OtpRecord, Duration)>>>,
    unavailable: AtomicBool,
    fail_deletes: AtomicBool,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

impl MockOtpRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            unavailable: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Make every call fail as if the store were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only deletes fail
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Store a record as-is, bypassing any checks
    pub async fn insert_raw(&self, record: OtpRecord) {
        let key = otp_key(record.purpose, &record.identifier);
        self.records
            .write()
            .await
            .insert(key, (record, Duration::from_secs(60)));
    }

    /// Current stored copy of a record
    pub async fn stored(&self, purpose: OtpPurpose, identifier: &str) -> Option<OtpRecord> {
        self.records
            .read()
            .await
            .get(&otp_key(purpose, identifier))
            .map(|(record, _)| record.clone())
    }

    /// TTL passed on the last write of a record
    pub async fn stored_ttl(&self, purpose: OtpPurpose, identifier: &str) -> Option<Duration> {
        self.records
            .read()
            .await
            .get(&otp_key(purpose, identifier))
            .map(|(_, ttl)| *ttl)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> DomainResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable {
                message: "mock store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockOtpRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpRepository for MockOtpRepository {
    async fn save(&self, record: &OtpRecord, ttl: Duration) -> DomainResult<()> {
        self.check_available()?;
        let key = otp_key(record.purpose, &record.identifier);
        self.records.write().await.insert(key, (record.clone(), ttl));
        Ok(())
    }

    async fn find(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<Option<OtpRecord>> {
        self.check_available()?;
        Ok(self.stored(purpose, identifier).await)
    }

    async fn update(&self, record: &OtpRecord) -> DomainResult<()> {
        self.check_available()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        let ttl = record
            .remaining_ttl_at(Utc::now())
            .ok_or(DomainError::Otp(OtpError::Expired))?;
        let key = otp_key(record.purpose, &record.identifier);
        self.records.write().await.insert(key, (record.clone(), ttl));
        Ok(())
    }

    async fn delete(&self, purpose: OtpPurpose, identifier: &str) -> DomainResult<()> {
        self.check_available()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DomainError::Unavailable {
                message: "mock delete failure".to_string(),
            });
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.records
            .write()
            .await
            .remove(&otp_key(purpose, identifier));
        Ok(())
    }
}
