mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use edifice::application::bus::{MessageHandler, TopicBus};
use edifice::domain::{ConnectionState, InboundMessage};
use edifice::error::{Error, Result, TransportError};
use edifice::port::outbound::transport::{PublishOptions, QoS};
use edifice::testkit::config::fast_reconnection;
use edifice::testkit::transport::{channel_stream, ConnectStep, MockTransport};

use support::wait::eventually;

fn bus() -> (TopicBus, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let bus = TopicBus::new(transport.clone(), fast_reconnection(), QoS::AtLeastOnce);
    (bus, transport)
}

fn counter() -> (Arc<AtomicUsize>, Arc<dyn MessageHandler>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let handler = Arc::new(move |_: &str, _: &InboundMessage| -> Result<()> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (count, handler)
}

#[tokio::test]
async fn subscriptions_survive_reconnect() {
    let (bus, transport) = bus();
    let (count, handler) = counter();
    let _sub = bus.subscribe("sensors/+/temperature", handler).await.unwrap();

    let (stream, handle) = channel_stream();
    let runner = tokio::spawn({
        let bus = bus.clone();
        async move { bus.run(stream).await }
    });

    eventually("first subscribe", || transport.subscribe_count("sensors/+/temperature") == 1).await;
    handle.deliver("sensors/t-1/temperature", "71.5");
    eventually("first delivery", || count.load(Ordering::SeqCst) == 1).await;

    handle.disconnect("network reset");
    eventually("resubscribe", || transport.subscribe_count("sensors/+/temperature") == 2).await;
    assert_eq!(handle.connect_attempts(), 2);

    handle.deliver("sensors/t-1/temperature", r#"{"value": 72.0}"#);
    eventually("second delivery", || count.load(Ordering::SeqCst) == 2).await;

    bus.shutdown();
    runner.await.unwrap().unwrap();
    assert_eq!(bus.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (bus, _) = bus();
    let (stream, handle) = channel_stream();
    handle.script([ConnectStep::Fail, ConnectStep::Fail, ConnectStep::Fail]);

    let err = bus.run(stream).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::RetriesExhausted { attempts: 3 })
    ));
    assert_eq!(handle.connect_attempts(), 3);
    assert_eq!(bus.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn hanging_connect_times_out_and_retries() {
    let (bus, transport) = bus();
    let (_, handler) = counter();
    let _sub = bus.subscribe("hvac/+/status", handler).await.unwrap();

    let (stream, handle) = channel_stream();
    handle.script([ConnectStep::Hang]);
    let runner = tokio::spawn({
        let bus = bus.clone();
        async move { bus.run(stream).await }
    });

    eventually("subscribed after timeout", || transport.subscribe_count("hvac/+/status") == 1).await;
    assert_eq!(handle.connect_attempts(), 2);

    bus.shutdown();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn publish_follows_connection_state() {
    let (bus, transport) = bus();
    let (stream, handle) = channel_stream();
    // Reconnect attempts hang, so the bus stays down until it gives up.
    handle.script([ConnectStep::Succeed, ConnectStep::Hang, ConnectStep::Hang, ConnectStep::Hang]);

    let runner = tokio::spawn({
        let bus = bus.clone();
        async move { bus.run(stream).await }
    });
    eventually("connected", || bus.state() == ConnectionState::Connected).await;

    bus.publish("alerts/a-1", b"{}".to_vec(), PublishOptions::default())
        .await
        .unwrap();
    assert_eq!(transport.published().len(), 1);

    handle.disconnect("broker restart");
    eventually("reconnecting", || bus.state() == ConnectionState::Reconnecting).await;
    let err = bus
        .publish("alerts/a-2", b"{}".to_vec(), PublishOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::NotConnected)));
    assert_eq!(transport.published().len(), 1);

    bus.shutdown();
    // Either stopped by shutdown or out of retries.
    let _ = runner.await.unwrap();
    assert_eq!(bus.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn closed_stream_ends_run() {
    let (bus, _) = bus();
    let (stream, handle) = channel_stream();
    let runner = tokio::spawn({
        let bus = bus.clone();
        async move { bus.run(stream).await }
    });

    eventually("connected", || bus.state() == ConnectionState::Connected).await;
    drop(handle);
    runner.await.unwrap().unwrap();
    assert_eq!(bus.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn state_changes_are_observable() {
    let (bus, _) = bus();
    let mut states = bus.watch_state();
    let (stream, handle) = channel_stream();
    let runner = tokio::spawn({
        let bus = bus.clone();
        async move { bus.run(stream).await }
    });

    let mut seen = Vec::new();
    while seen.last() != Some(&ConnectionState::Connected) {
        states.changed().await.unwrap();
        seen.push(*states.borrow_and_update());
    }
    assert!(seen.ends_with(&[ConnectionState::Connected]));

    bus.shutdown();
    runner.await.unwrap().unwrap();
    drop(handle);
}
