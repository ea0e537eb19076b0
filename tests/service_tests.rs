mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use edifice::domain::{ConnectionState, RoomKey};
use edifice::infrastructure::bootstrap::Service;
use edifice::port::outbound::notifier::{Event, NotifierRegistry};
use edifice::testkit::config::test_config;
use edifice::testkit::domain::directory_entry;
use edifice::testkit::notifier::RecordingNotifier;
use edifice::testkit::transport::{channel_stream, ConnectStep, MockTransport};

use support::wait::{eventually, next_event};

async fn service() -> (Service, Arc<MockTransport>, RecordingNotifier) {
    let mut config = test_config();
    config.directory = vec![directory_entry("t-1", "hq", Some("floor-1"), Some("ahu-1"))];

    let transport = Arc::new(MockTransport::new());
    let notifier = RecordingNotifier::new();
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(notifier.clone()));

    let service = Service::build_with(config, transport.clone(), registry).await.unwrap();
    (service, transport, notifier)
}

#[tokio::test]
async fn critical_reading_flows_to_observers_broker_and_notifiers() {
    let (service, transport, notifier) = service().await;
    let bus = service.bus().clone();
    let hub = Arc::clone(service.hub());
    let alerts = Arc::clone(service.alerts());

    let mut observer = hub.register();
    assert!(hub.join(observer.id, RoomKey::zone("floor-1")));

    let (stream, handle) = channel_stream();
    let runner = tokio::spawn(service.run(stream));

    handle.deliver("sensors/t-1/temperature", "95");

    let zone = next_event(&mut observer.frames, "zone:update").await;
    assert_eq!(zone["data"]["sourceId"], "t-1");
    assert_eq!(zone["data"]["value"], 95.0);

    let raised = next_event(&mut observer.frames, "alert:new").await;
    assert_eq!(raised["data"]["severity"], "critical");
    assert_eq!(raised["data"]["status"], "active");
    let alert_id = raised["data"]["id"].as_str().unwrap().to_string();

    eventually("protective shutdown", || {
        transport
            .published()
            .iter()
            .any(|m| m.topic == "equipment/ahu-1/control")
    })
    .await;
    let published = transport.published();
    assert!(published.iter().any(|m| m.topic == format!("alerts/{alert_id}")));
    let command = published
        .iter()
        .find(|m| m.topic == "equipment/ahu-1/control")
        .unwrap()
        .json();
    assert_eq!(command["action"]["type"], "shutdown");
    assert_eq!(command["origin"]["kind"], "alert_engine");

    eventually("notifications", || notifier.events().len() >= 2).await;
    let events = notifier.events();
    assert!(matches!(&events[0], Event::AlertRaised(alert) if alert.source_id == "t-1"));
    assert!(matches!(&events[1], Event::ProtectiveAction { equipment_id, .. } if equipment_id == "ahu-1"));
    assert_eq!(alerts.open_alerts().await.unwrap().len(), 1);

    handle.deliver("sensors/t-1/temperature", r#"{"value": 70.0}"#);
    let update = next_event(&mut observer.frames, "alert:update").await;
    assert_eq!(update["data"]["id"], alert_id.as_str());
    assert_eq!(update["data"]["status"], "resolved");
    assert_eq!(update["data"]["resolvedBy"], "system");
    assert!(alerts.open_alerts().await.unwrap().is_empty());

    bus.shutdown();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn repeated_breaches_open_one_alert() {
    let (service, _, notifier) = service().await;
    let bus = service.bus().clone();
    let alerts = Arc::clone(service.alerts());

    let (stream, handle) = channel_stream();
    let runner = tokio::spawn(service.run(stream));

    for value in ["84", "86", "88", "85"] {
        handle.deliver("sensors/t-1/temperature", value);
    }
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let open = alerts.open_alerts().await.unwrap();
        if let [only] = open.as_slice() {
            if only.trigger_value == 85.0 {
                break;
            }
        }
        assert!(Instant::now() < deadline, "open alert never reached the last trigger value");
        sleep(Duration::from_millis(5)).await;
    }

    let raised = notifier
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::AlertRaised(_)))
        .count();
    assert_eq!(raised, 1);

    bus.shutdown();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn lost_connection_is_reported() {
    let (service, transport, notifier) = service().await;
    let bus = service.bus().clone();
    let hub = Arc::clone(service.hub());
    let mut observer = hub.register();

    let (stream, handle) = channel_stream();
    let runner = tokio::spawn(service.run(stream));
    eventually("subscribed", || transport.subscribe_count("sensors/+/+") == 1).await;

    handle.script([ConnectStep::Hang]);
    handle.disconnect("broker went away");

    loop {
        let status = next_event(&mut observer.frames, "system:status").await;
        if status["data"]["transport"] == "reconnecting" {
            break;
        }
    }
    eventually("degraded notification", || {
        notifier
            .events()
            .iter()
            .any(|e| matches!(e, Event::TransportDegraded { .. }))
    })
    .await;

    eventually("reconnected", || bus.state() == ConnectionState::Connected).await;
    eventually("resubscribed", || transport.subscribe_count("sensors/+/+") == 2).await;

    bus.shutdown();
    runner.await.unwrap().unwrap();
}
