//! Key/value store with expiry and atomic counters.
//!
//! Backs both the response cache and rate-limit windows. Keys arrive fully
//! namespaced; values are opaque strings (JSON at the cache layer).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub type StoreResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrite `key`; `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Returns true if a key was removed.
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// Delete every key matching a glob. Returns the number removed.
    async fn del_pattern(&self, pattern: &str) -> StoreResult<u64>;

    /// Atomically add `amount`, creating the key at zero. Returns the new value.
    async fn increment(&self, key: &str, amount: i64) -> StoreResult<i64>;

    /// Set a TTL on an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remaining TTL; `None` when the key is absent or never expires.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Backend name for logs.
    fn backend(&self) -> &'static str;
}
