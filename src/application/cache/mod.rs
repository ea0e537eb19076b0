//! Namespaced JSON cache over a [`CacheStore`].
//!
//! Every call is bounded by the configured request timeout. Results keep
//! the store's [`CacheError`] so callers decide whether to fail open.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::port::outbound::store::{CacheStore, StoreResult};

pub struct Cache {
    store: Arc<dyn CacheStore>,
    namespace: String,
    request_timeout: Duration,
}

impl Cache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            request_timeout,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    fn key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.namespace)
        }
    }

    fn pattern(&self, pattern: &str) -> String {
        if self.namespace.is_empty() {
            pattern.to_string()
        } else {
            format!("{}:{pattern}", escape_glob(&self.namespace))
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match timeout(self.request_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            }),
        }
    }

    /// Read and decode a value. A value that no longer decodes is evicted
    /// and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let full = self.key(key);
        let Some(raw) = self.bounded(self.store.get(&full)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key = %full, error = %err, "Evicting undecodable cache entry");
                self.bounded(self.store.del(&full)).await?;
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.bounded(self.store.set(&self.key(key), &raw, ttl)).await
    }

    pub async fn del(&self, key: &str) -> StoreResult<bool> {
        self.bounded(self.store.del(&self.key(key))).await
    }

    /// Delete every key in this namespace matching the glob `pattern`.
    pub async fn del_pattern(&self, pattern: &str) -> StoreResult<u64> {
        self.bounded(self.store.del_pattern(&self.pattern(pattern))).await
    }

    /// Best-effort [`del_pattern`](Self::del_pattern); failures are logged.
    pub async fn invalidate(&self, pattern: &str) -> u64 {
        match self.del_pattern(pattern).await {
            Ok(removed) => {
                debug!(pattern, removed, "Cache invalidated");
                removed
            }
            Err(err) => {
                warn!(pattern, error = %err, "Cache invalidation failed");
                0
            }
        }
    }

    pub async fn increment(&self, key: &str, amount: i64) -> StoreResult<i64> {
        self.bounded(self.store.increment(&self.key(key), amount)).await
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.bounded(self.store.expire(&self.key(key), ttl)).await
    }

    pub async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        self.bounded(self.store.ttl(&self.key(key))).await
    }

    /// Cache-aside read.
    ///
    /// Returns the cached value when present, otherwise runs `loader` and
    /// stores its result for `ttl`. An unreachable store degrades to calling
    /// `loader` directly.
    pub async fn remember<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(err) => warn!(key, error = %err, "Cache read failed, loading directly"),
        }

        let value = loader().await?;
        if let Err(err) = self.set(key, &value, Some(ttl)).await {
            warn!(key, error = %err, "Cache write failed");
        }
        Ok(value)
    }
}

/// Escape glob metacharacters so `text` matches only itself.
pub(crate) fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde::Deserialize;

    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        setpoint: f64,
    }

    fn cache() -> (Cache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Cache::new(store.clone(), "test", Duration::from_millis(200)), store)
    }

    #[tokio::test]
    async fn values_are_namespaced_json() {
        let (cache, store) = cache();
        cache.set("settings:hq", &Settings { setpoint: 70.0 }, None).await.unwrap();

        assert_eq!(
            store.get("test:settings:hq").await.unwrap().as_deref(),
            Some(r#"{"setpoint":70.0}"#)
        );
        assert_eq!(
            cache.get::<Settings>("settings:hq").await.unwrap(),
            Some(Settings { setpoint: 70.0 })
        );
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss_and_evicted() {
        let (cache, store) = cache();
        store.set("test:settings:hq", "not json", None).await.unwrap();

        assert_eq!(cache.get::<Settings>("settings:hq").await.unwrap(), None);
        assert!(store.get("test:settings:hq").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_stays_inside_namespace() {
        let (cache, store) = cache();
        cache.set("analytics:hq:1", &1, None).await.unwrap();
        cache.set("analytics:hq:2", &2, None).await.unwrap();
        store.set("other:analytics:hq:3", "3", None).await.unwrap();

        assert_eq!(cache.invalidate("analytics:hq:*").await, 2);
        assert!(store.get("other:analytics:hq:3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remember_loads_once() {
        let (cache, _) = cache();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = cache
                .remember("report", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, crate::error::Error>(42u32)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn escapes_glob_metacharacters() {
        assert_eq!(escape_glob("a*b?[c]"), r"a\*b\?\[c\]");
    }
}
