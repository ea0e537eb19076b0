//! Cache stores that fail on purpose.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::port::outbound::store::{CacheStore, StoreResult};

/// A store whose backend is never reachable.
pub struct UnavailableStore;

fn down<T>() -> StoreResult<T> {
    Err(CacheError::Unavailable {
        reason: "store offline".into(),
    })
}

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn get(&self, _: &str) -> StoreResult<Option<String>> {
        down()
    }

    async fn set(&self, _: &str, _: &str, _: Option<Duration>) -> StoreResult<()> {
        down()
    }

    async fn del(&self, _: &str) -> StoreResult<bool> {
        down()
    }

    async fn del_pattern(&self, _: &str) -> StoreResult<u64> {
        down()
    }

    async fn increment(&self, _: &str, _: i64) -> StoreResult<i64> {
        down()
    }

    async fn expire(&self, _: &str, _: Duration) -> StoreResult<bool> {
        down()
    }

    async fn ttl(&self, _: &str) -> StoreResult<Option<Duration>> {
        down()
    }

    fn backend(&self) -> &'static str {
        "unavailable"
    }
}
