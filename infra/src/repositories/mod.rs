//! Repository implementations backed by infrastructure services

pub mod otp_repository;

pub use otp_repository::CacheOtpRepository;
