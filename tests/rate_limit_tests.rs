use std::sync::Arc;
use std::time::Duration;

use edifice::adapter::outbound::memory::MemoryStore;
use edifice::application::cache::Cache;
use edifice::application::control::ControlGateway;
use edifice::application::ratelimit::{ActionClass, Identity, Policy, PolicySet, RateLimiter, Role};
use edifice::domain::equipment::ControlAction;
use edifice::error::Error;
use edifice::testkit::publisher::RecordingPublisher;
use edifice::testkit::store::UnavailableStore;

fn policy(prefix: &str, window_secs: u64, max_requests: u64) -> Policy {
    Policy {
        prefix: prefix.into(),
        window: Duration::from_secs(window_secs),
        max_requests,
    }
}

fn limiter(max_requests: u64) -> Arc<RateLimiter> {
    let cache = Arc::new(Cache::new(Arc::new(MemoryStore::new()), "it", Duration::from_secs(1)));
    let policies = PolicySet::new(
        policy("rl:general", 60, max_requests),
        policy("rl:auth", 900, 5),
        policy("rl:control", 60, 2),
    )
    .with_role(Role::Admin, policy("rl:admin", 60, 1000));
    Arc::new(RateLimiter::new(cache, policies))
}

#[tokio::test(start_paused = true)]
async fn window_resets_after_expiry() {
    let limiter = limiter(3);
    let caller = Identity::anonymous("10.1.1.1");

    for expected_remaining in [2, 1, 0] {
        let admission = limiter.admit(&caller, ActionClass::General).await;
        assert!(admission.allowed);
        assert_eq!(admission.remaining, expected_remaining);
    }

    let denied = limiter.admit(&caller, ActionClass::General).await;
    assert!(!denied.allowed);
    assert_eq!(denied.status_code(), 429);
    assert_eq!(denied.retry_after_secs, 60);

    tokio::time::advance(Duration::from_secs(61)).await;
    let fresh = limiter.admit(&caller, ActionClass::General).await;
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_never_exceed_limit() {
    let limiter = limiter(10);
    let mut tasks = Vec::new();
    for _ in 0..40 {
        let limiter = Arc::clone(&limiter);
        tasks.push(tokio::spawn(async move {
            limiter
                .admit(&Identity::user("u-1", "10.0.0.1", Role::Viewer), ActionClass::General)
                .await
                .allowed
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 10);
}

#[tokio::test]
async fn role_override_does_not_relax_control() {
    let limiter = limiter(1);
    let admin = Identity::user("root", "10.0.0.2", Role::Admin);

    for _ in 0..5 {
        assert!(limiter.admit(&admin, ActionClass::General).await.allowed);
    }
    assert!(limiter.admit(&admin, ActionClass::Control).await.allowed);
    assert!(limiter.admit(&admin, ActionClass::Control).await.allowed);
    assert!(!limiter.admit(&admin, ActionClass::Control).await.allowed);
}

#[tokio::test]
async fn store_outage_fails_open_and_is_flagged() {
    let cache = Arc::new(Cache::new(Arc::new(UnavailableStore), "it", Duration::from_millis(100)));
    let limiter = RateLimiter::new(cache, PolicySet::new(
        policy("rl:general", 60, 1),
        policy("rl:auth", 60, 1),
        policy("rl:control", 60, 1),
    ));

    let caller = Identity::anonymous("10.9.9.9");
    for _ in 0..3 {
        let admission = limiter.admit(&caller, ActionClass::Authentication).await;
        assert!(admission.allowed);
        assert!(admission.degraded);
    }
}

#[tokio::test]
async fn control_denial_reaches_caller_with_retry_hint() {
    let publisher = Arc::new(RecordingPublisher::new());
    let gateway = ControlGateway::new(limiter(100), publisher.clone());
    let operator = Identity::user("op-7", "10.0.0.3", Role::Operator);

    gateway.request(&operator, "ahu-1", ControlAction::Start).await.unwrap();
    gateway
        .request(&operator, "ahu-1", ControlAction::Setpoint { value: 70.0 })
        .await
        .unwrap();

    match gateway.request(&operator, "ahu-1", ControlAction::Stop).await {
        Err(Error::Throttled(denied)) => {
            assert_eq!(denied.policy, "rl:control");
            assert_eq!(denied.limit, 2);
            assert!(denied.retry_after_secs >= 1);
        }
        other => panic!("expected a throttle, got {other:?}"),
    }
    assert_eq!(publisher.json_on("equipment/ahu-1/control").len(), 2);
}
