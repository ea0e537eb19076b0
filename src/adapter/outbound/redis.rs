//! Redis cache store, shared across instances.
//!
//! Requires the `redis` feature. Commands go through a [`ConnectionManager`],
//! which reconnects on its own; any I/O failure surfaces as
//! [`CacheError::Unavailable`] so callers can fail open.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::port::outbound::store::{CacheStore, StoreResult};

const SCAN_BATCH: u32 = 200;

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Open a managed connection to `url`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(unavailable)?;
        let manager = ConnectionManager::new(client).await.map_err(unavailable)?;
        info!("Connected to Redis cache");
        Ok(Self { manager })
    }
}

fn unavailable(err: RedisError) -> CacheError {
    CacheError::Unavailable {
        reason: err.to_string(),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await.map_err(unavailable)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn del_pattern(&self, pattern: &str) -> StoreResult<u64> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            if !keys.is_empty() {
                let count: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(unavailable)?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!(pattern, removed, "Redis keys removed by pattern");
        Ok(removed)
    }

    async fn increment(&self, key: &str, amount: i64) -> StoreResult<i64> {
        let mut conn = self.manager.clone();
        redis::cmd("INCRBY")
            .arg(key)
            .arg(amount)
            .query_async(&mut conn)
            .await
            .map_err(|err: RedisError| {
                if err.kind() == ErrorKind::ResponseError {
                    CacheError::NotAnInteger { key: key.to_string() }
                } else {
                    unavailable(err)
                }
            })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        let applied: u8 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(applied == 1)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.manager.clone();
        // -2: no key, -1: no expiry.
        let remaining: i64 = redis::cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(u64::try_from(remaining).ok().map(Duration::from_millis))
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
