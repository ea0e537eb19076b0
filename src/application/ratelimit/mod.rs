//! Fixed-window rate limiting on the shared cache.
//!
//! Each `{prefix}:{identity}` counter is incremented atomically and expires
//! one window after its first increment. A burst straddling a window
//! boundary can therefore admit up to twice `max_requests` in one window's
//! span; that is the known cost of the fixed-window algorithm.
//!
//! When the store cannot be consulted the limiter fails open: the request
//! is admitted and the admission is marked `degraded`.

mod policy;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub use policy::{ActionClass, Identity, Policy, PolicySet, Role};

use crate::application::cache::Cache;
use crate::error::{CacheError, ThrottleExceeded};

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the window resets; zero when allowed.
    pub retry_after_secs: u64,
    /// Admitted without consulting the store.
    pub degraded: bool,
    pub policy: String,
}

impl Admission {
    /// HTTP status for this admission.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.allowed {
            200
        } else {
            ThrottleExceeded::STATUS_CODE
        }
    }

    /// Turn a denial into [`ThrottleExceeded`].
    pub fn into_result(self) -> Result<Self, ThrottleExceeded> {
        if self.allowed {
            Ok(self)
        } else {
            Err(ThrottleExceeded {
                policy: self.policy,
                limit: self.limit,
                retry_after_secs: self.retry_after_secs,
            })
        }
    }
}

pub struct RateLimiter {
    cache: Arc<Cache>,
    policies: PolicySet,
}

impl RateLimiter {
    #[must_use]
    pub fn new(cache: Arc<Cache>, policies: PolicySet) -> Self {
        Self { cache, policies }
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Admit one request of `class` from `identity`.
    pub async fn admit(&self, identity: &Identity, class: ActionClass) -> Admission {
        let policy = self.policies.select(identity, class);
        self.admit_with(identity, policy).await
    }

    /// Admit one request against an explicit policy.
    pub async fn admit_with(&self, identity: &Identity, policy: &Policy) -> Admission {
        let key = counter_key(policy, identity);

        let count = match self.cache.increment(&key, 1).await {
            Ok(count) => count,
            Err(err) => return fail_open(policy, &key, &err),
        };

        if count == 1 {
            if let Err(err) = self.cache.expire(&key, policy.window).await {
                warn!(key = %key, error = %err, "Could not arm rate-limit window");
            }
        }

        let used = u64::try_from(count).unwrap_or(0);
        if used <= policy.max_requests {
            return Admission {
                allowed: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - used,
                retry_after_secs: 0,
                degraded: false,
                policy: policy.prefix.clone(),
            };
        }

        let retry_after = match self.cache.ttl(&key).await {
            Ok(Some(ttl)) => ttl,
            Ok(None) => {
                // Expiry lost; re-arm the window.
                if let Err(err) = self.cache.expire(&key, policy.window).await {
                    warn!(key = %key, error = %err, "Could not re-arm rate-limit window");
                }
                policy.window
            }
            Err(err) => return fail_open(policy, &key, &err),
        };

        debug!(key = %key, count, limit = policy.max_requests, "Rate limit exceeded");
        Admission {
            allowed: false,
            limit: policy.max_requests,
            remaining: 0,
            retry_after_secs: ceil_secs(retry_after),
            degraded: false,
            policy: policy.prefix.clone(),
        }
    }

    /// Return one unit to `identity`'s window, e.g. on connection teardown.
    pub async fn release(&self, identity: &Identity, class: ActionClass) {
        let policy = self.policies.select(identity, class);
        let key = counter_key(policy, identity);
        match self.cache.increment(&key, -1).await {
            Ok(count) if count <= 0 => {
                if let Err(err) = self.cache.del(&key).await {
                    debug!(key = %key, error = %err, "Could not clear drained counter");
                }
            }
            Ok(_) => {}
            Err(err) => debug!(key = %key, error = %err, "Rate-limit release skipped"),
        }
    }
}

fn counter_key(policy: &Policy, identity: &Identity) -> String {
    format!("{}:{}", policy.prefix, identity.key())
}

fn fail_open(policy: &Policy, key: &str, err: &CacheError) -> Admission {
    if err.is_unavailable() {
        warn!(key, error = %err, "Rate-limit store unavailable, failing open");
    } else {
        warn!(key, error = %err, "Rate-limit counter unusable, failing open");
    }
    Admission {
        allowed: true,
        limit: policy.max_requests,
        remaining: policy.max_requests,
        retry_after_secs: 0,
        degraded: true,
        policy: policy.prefix.clone(),
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
