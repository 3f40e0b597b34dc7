//! Expiring key-value store behind the OTP and pending-registration flows.
//!
//! The contract is deliberately minimal and storage-agnostic: every operation
//! on a missing or expired key reads as absent, never as an error, and
//! `increment` and `set_if_absent` must be atomic across processes.
//! Production uses the Redis backend; tests and local development use the
//! in-memory backend.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("counter value is not an integer")]
    NotACounter,
}

/// Capability interface over a TTL-capable key-value backend.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store a value under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically store a value only when no live key exists. Returns whether
    /// this call claimed the key; concurrent callers see exactly one `true`.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Read a value; expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomic read-and-remove; a key can be taken exactly once.
    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increment a counter, initializing it to 1 with `ttl` when
    /// the key does not exist so rate windows self-expire.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Whether a live (unexpired) key exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
