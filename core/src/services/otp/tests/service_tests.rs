//! Unit tests for the OTP service

use chrono::{Duration, Utc};
use std::sync::Arc;
use uptime_shared::config::OtpConfig;

use crate::domain::entities::otp::{OtpPurpose, OtpRecord};
use crate::errors::{DomainError, OtpError};
use crate::repositories::MockOtpRepository;
use crate::services::otp::{OtpEngine, OtpService};

const EMAIL: &str = "alice@example.com";

fn service_with(config: OtpConfig) -> (OtpService<MockOtpRepository>, Arc<MockOtpRepository>) {
    let repository = Arc::new(MockOtpRepository::new());
    let service = OtpService::new(repository.clone(), OtpEngine::new(config));
    (service, repository)
}

fn service() -> (OtpService<MockOtpRepository>, Arc<MockOtpRepository>) {
    service_with(OtpConfig::default())
}

fn wrong_code(code: &str) -> String {
    if code == "000000" {
        "111111".to_string()
    } else {
        "000000".to_string()
    }
}

fn otp_err(err: DomainError) -> OtpError {
    match err {
        DomainError::Otp(err) => err,
        other => panic!("Expected OTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_and_save() {
    let (service, repository) = service();

    let code = service
        .generate_and_save(EMAIL, OtpPurpose::EmailVerification)
        .await
        .unwrap();
    assert_eq!(code.len(), 6);

    let stored = repository.stored(OtpPurpose::EmailVerification, EMAIL).await.unwrap();
    assert_eq!(stored.code, code);
    assert_eq!(stored.attempts, 0);
    assert!(!stored.used);
    assert_eq!(
        repository.stored_ttl(OtpPurpose::EmailVerification, EMAIL).await,
        Some(std::time::Duration::from_secs(30 * 60))
    );
}

#[tokio::test]
async fn test_regenerate_replaces_previous_code() {
    let (service, repository) = service();

    service.generate_and_save(EMAIL, OtpPurpose::PasswordReset).await.unwrap();
    let second = service.generate_and_save(EMAIL, OtpPurpose::PasswordReset).await.unwrap();

    let stored = repository.stored(OtpPurpose::PasswordReset, EMAIL).await.unwrap();
    assert_eq!(stored.code, second);
}

#[tokio::test]
async fn test_generate_store_failure() {
    let (service, repository) = service();
    repository.set_unavailable(true);

    let err = service
        .generate_and_save(EMAIL, OtpPurpose::PasswordReset)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unavailable { .. }));
}

#[tokio::test]
async fn test_verify_success_consumes_record() {
    let (service, repository) = service();
    let code = service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();

    let record = service
        .verify(EMAIL, OtpPurpose::EmailVerification, &code)
        .await
        .unwrap();
    assert!(record.used);
    assert_eq!(record.attempts, 1);
    assert!(repository.stored(OtpPurpose::EmailVerification, EMAIL).await.is_none());

    let err = service
        .verify(EMAIL, OtpPurpose::EmailVerification, &code)
        .await
        .unwrap_err();
    assert_eq!(otp_err(err), OtpError::NotFound);
}

#[tokio::test]
async fn test_wrong_then_right_code() {
    let (service, repository) = service();
    let code = service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();

    let err = service
        .verify(EMAIL, OtpPurpose::EmailVerification, &wrong_code(&code))
        .await
        .unwrap_err();
    assert_eq!(otp_err(err), OtpError::InvalidCode { remaining_attempts: 2 });

    let stored = repository.stored(OtpPurpose::EmailVerification, EMAIL).await.unwrap();
    assert_eq!(stored.attempts, 1);
    assert!(!stored.used);

    let record = service
        .verify(EMAIL, OtpPurpose::EmailVerification, &code)
        .await
        .unwrap();
    assert_eq!(record.attempts, 2);
    assert!(record.used);
}

#[tokio::test]
async fn test_exhaustion_purges_record() {
    let (service, repository) = service();
    let code = service.generate_and_save(EMAIL, OtpPurpose::PasswordReset).await.unwrap();
    let wrong = wrong_code(&code);

    let first = service.verify(EMAIL, OtpPurpose::PasswordReset, &wrong).await.unwrap_err();
    assert_eq!(otp_err(first), OtpError::InvalidCode { remaining_attempts: 2 });
    let second = service.verify(EMAIL, OtpPurpose::PasswordReset, &wrong).await.unwrap_err();
    assert_eq!(otp_err(second), OtpError::InvalidCode { remaining_attempts: 1 });
    let third = service.verify(EMAIL, OtpPurpose::PasswordReset, &wrong).await.unwrap_err();
    assert_eq!(otp_err(third), OtpError::TooManyAttempts);

    assert!(repository.stored(OtpPurpose::PasswordReset, EMAIL).await.is_none());

    let after = service.verify(EMAIL, OtpPurpose::PasswordReset, &code).await.unwrap_err();
    assert_eq!(otp_err(after), OtpError::NotFound);
}

#[tokio::test]
async fn test_purposes_are_independent() {
    let (service, _) = service();
    let reset = service.generate_and_save(EMAIL, OtpPurpose::PasswordReset).await.unwrap();
    service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();

    let err = service
        .verify(EMAIL, OtpPurpose::PhoneVerification, &reset)
        .await
        .unwrap_err();
    assert_eq!(otp_err(err), OtpError::NotFound);

    assert!(service.verify(EMAIL, OtpPurpose::PasswordReset, &reset).await.is_ok());
}

#[tokio::test]
async fn test_expired_record_is_deleted() {
    let (service, repository) = service();
    let now = Utc::now();
    repository
        .insert_raw(OtpRecord {
            code: "424242".to_string(),
            identifier: EMAIL.to_string(),
            purpose: OtpPurpose::PasswordReset,
            expires_at: now - Duration::seconds(1),
            used: false,
            attempts: 1,
            created_at: now - Duration::minutes(16),
        })
        .await;

    let err = service.verify(EMAIL, OtpPurpose::PasswordReset, "424242").await.unwrap_err();
    assert_eq!(otp_err(err), OtpError::Expired);
    assert!(repository.stored(OtpPurpose::PasswordReset, EMAIL).await.is_none());
    assert_eq!(repository.update_count(), 0);
}

#[tokio::test]
async fn test_expired_survives_delete_failure() {
    let (service, repository) = service();
    let now = Utc::now();
    repository
        .insert_raw(OtpRecord {
            code: "424242".to_string(),
            identifier: EMAIL.to_string(),
            purpose: OtpPurpose::PasswordReset,
            expires_at: now - Duration::seconds(1),
            used: false,
            attempts: 0,
            created_at: now - Duration::minutes(16),
        })
        .await;
    repository.set_fail_deletes(true);

    let err = service.verify(EMAIL, OtpPurpose::PasswordReset, "424242").await.unwrap_err();
    assert_eq!(otp_err(err), OtpError::Expired);
}

#[tokio::test]
async fn test_used_record_is_reported() {
    let (service, repository) = service();
    let now = Utc::now();
    repository
        .insert_raw(OtpRecord {
            code: "424242".to_string(),
            identifier: EMAIL.to_string(),
            purpose: OtpPurpose::EmailVerification,
            expires_at: now + Duration::minutes(10),
            used: true,
            attempts: 1,
            created_at: now,
        })
        .await;

    let err = service
        .verify(EMAIL, OtpPurpose::EmailVerification, "424242")
        .await
        .unwrap_err();
    assert_eq!(otp_err(err), OtpError::AlreadyUsed);

    let stored = repository.stored(OtpPurpose::EmailVerification, EMAIL).await.unwrap();
    assert_eq!(stored.attempts, 1);
}

#[tokio::test]
async fn test_store_failure_is_not_not_found() {
    let (service, repository) = service();
    service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();
    repository.set_unavailable(true);

    let err = service
        .verify(EMAIL, OtpPurpose::EmailVerification, "123456")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unavailable { .. }));
}

#[tokio::test]
async fn test_success_with_failed_delete_keeps_code_usable() {
    let (service, repository) = service();
    let code = service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();
    repository.set_fail_deletes(true);

    let err = service
        .verify(EMAIL, OtpPurpose::EmailVerification, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unavailable { .. }));

    let stored = repository.stored(OtpPurpose::EmailVerification, EMAIL).await.unwrap();
    assert!(!stored.used);

    repository.set_fail_deletes(false);
    assert!(service.verify(EMAIL, OtpPurpose::EmailVerification, &code).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_codes_are_all_counted() {
    let (service, repository) = service_with(OtpConfig {
        max_attempts: 100,
        ..OtpConfig::default()
    });
    let service = Arc::new(service);
    let code = service.generate_and_save(EMAIL, OtpPurpose::EmailVerification).await.unwrap();
    let wrong = wrong_code(&code);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = service.clone();
        let wrong = wrong.clone();
        handles.push(tokio::spawn(async move {
            service.verify(EMAIL, OtpPurpose::EmailVerification, &wrong).await
        }));
    }
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(otp_err(err), OtpError::InvalidCode { .. }));
    }

    let stored = repository.stored(OtpPurpose::EmailVerification, EMAIL).await.unwrap();
    assert_eq!(stored.attempts, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_correct_codes_succeed_once() {
    let (service, _) = service();
    let service = Arc::new(service);
    let code = service.generate_and_save(EMAIL, OtpPurpose::PhoneVerification).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            service.verify(EMAIL, OtpPurpose::PhoneVerification, &code).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(otp_err(err), OtpError::NotFound),
        }
    }
    assert_eq!(successes, 1);
}
