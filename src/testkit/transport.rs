//! Broker transport doubles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::port::outbound::transport::{
    PublishOptions, QoS, Transport, TransportEvent, TransportStream,
};

/// A message captured by a test double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub options: PublishOptions,
}

impl PublishedMessage {
    /// Payload parsed as JSON; `Null` when it is not JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Request side that records every call instead of talking to a broker.
#[derive(Default)]
pub struct MockTransport {
    published: Mutex<Vec<PublishedMessage>>,
    subscribed: Mutex<Vec<(String, QoS)>>,
    unsubscribed: Mutex<Vec<String>>,
    fail_publishes: AtomicBool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with a client error.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    /// Every subscribe request, in order, including repeats after reconnects.
    #[must_use]
    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().iter().map(|(filter, _)| filter.clone()).collect()
    }

    /// How many times `filter` was subscribed.
    #[must_use]
    pub fn subscribe_count(&self, filter: &str) -> usize {
        self.subscribed.lock().iter().filter(|(f, _)| f == filter).count()
    }

    #[must_use]
    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<()> {
        self.subscribed.lock().push((filter.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.unsubscribed.lock().push(filter.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(TransportError::Client("mock publish failure".into()).into());
        }
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            options,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// Outcome of one scripted `connect()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    Succeed,
    Fail,
    /// Never completes; exercises the connect timeout.
    Hang,
}

/// Event stream controlled externally via a [`StreamHandle`].
///
/// Connect attempts follow the script and succeed once it runs out. The
/// stream closes when the handle is dropped.
pub struct ChannelStream {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    script: Arc<Mutex<VecDeque<ConnectStep>>>,
    connect_attempts: Arc<AtomicU32>,
}

/// Control handle for a [`ChannelStream`].
pub struct StreamHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    script: Arc<Mutex<VecDeque<ConnectStep>>>,
    connect_attempts: Arc<AtomicU32>,
}

impl StreamHandle {
    /// Deliver a broker message.
    pub fn deliver(&self, topic: &str, payload: impl Into<Vec<u8>>) {
        let _ = self.events.send(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.into(),
        });
    }

    /// Simulate losing the connection.
    pub fn disconnect(&self, reason: &str) {
        let _ = self.events.send(TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Simulate a session re-established by the client library.
    pub fn connected(&self) {
        let _ = self.events.send(TransportEvent::Connected);
    }

    /// Queue outcomes for the next connect attempts.
    pub fn script(&self, steps: impl IntoIterator<Item = ConnectStep>) {
        self.script.lock().extend(steps);
    }

    /// How many times `connect()` was called.
    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

/// Create a [`ChannelStream`] and its control [`StreamHandle`].
#[must_use]
pub fn channel_stream() -> (ChannelStream, StreamHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let script = Arc::new(Mutex::new(VecDeque::new()));
    let attempts = Arc::new(AtomicU32::new(0));
    (
        ChannelStream {
            events: rx,
            script: script.clone(),
            connect_attempts: attempts.clone(),
        },
        StreamHandle {
            events: tx,
            script,
            connect_attempts: attempts,
        },
    )
}

#[async_trait]
impl TransportStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(ConnectStep::Succeed);
        match step {
            ConnectStep::Succeed => Ok(()),
            ConnectStep::Fail => Err(TransportError::Refused("scripted failure".into()).into()),
            ConnectStep::Hang => std::future::pending().await,
        }
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }
}
