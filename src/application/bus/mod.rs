//! Topic bus: wildcard publish/subscribe over a broker transport.
//!
//! The bus owns the subscription table and the connection lifecycle. It
//! keeps every registered pattern subscribed across reconnects, decodes
//! inbound payloads once, and fans each message out to matching handlers
//! with per-handler fault isolation.
//!
//! Registry changes and the broker requests that mirror them run under one
//! async lock, so the broker's filter set never lags the registry. Broker
//! requests are never awaited on the task that polls the stream: a client
//! library may only make room for new requests while it is being polled.

pub mod backoff;
pub mod codec;
mod handler;
mod registry;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

pub use backoff::Backoff;
pub use handler::MessageHandler;
pub use registry::{SubscriptionId, SubscriptionRegistry};

use crate::domain::connection::ConnectionState;
use crate::domain::topic::{validate_topic, TopicPattern};
use crate::error::{Result, TransportError};
use crate::infrastructure::config::transport::ReconnectionConfig;
use crate::port::outbound::publisher::Publisher;
use crate::port::outbound::transport::{
    PublishOptions, QoS, Transport, TransportEvent, TransportStream,
};

struct Inner {
    transport: Arc<dyn Transport>,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionState>,
    reconnection: ReconnectionConfig,
    qos: QoS,
    shutdown: Notify,
    /// Held across a registry change and its broker request.
    broker: Mutex<()>,
    resubscriber: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle to a topic bus.
#[derive(Clone)]
pub struct TopicBus {
    inner: Arc<Inner>,
}

/// Returned by [`TopicBus::subscribe`]; cancelling removes this handler only.
#[must_use = "dropping the handle keeps the subscription; call cancel() to remove it"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    pattern: TopicPattern,
    bus: TopicBus,
}

impl SubscriptionHandle {
    #[must_use]
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Remove this handler. The broker subscription is dropped with the
    /// last handler for the pattern.
    pub async fn cancel(self) -> Result<()> {
        let _broker = self.bus.inner.broker.lock().await;
        let Some((pattern, last)) = self.bus.inner.registry.remove(self.id) else {
            return Ok(());
        };
        if last && self.bus.state().is_connected() {
            self.bus.inner.transport.unsubscribe(pattern.as_str()).await?;
        }
        debug!(pattern = %pattern, last, "Subscription cancelled");
        Ok(())
    }
}

impl TopicBus {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, reconnection: ReconnectionConfig, qos: QoS) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                transport,
                registry: SubscriptionRegistry::new(),
                state,
                reconnection,
                qos,
                shutdown: Notify::new(),
                broker: Mutex::new(()),
                resubscriber: parking_lot::Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Observe connection-state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Register `handler` for topics matching `pattern`.
    ///
    /// When connected and the pattern is new, the broker subscription is
    /// requested immediately; a failed request is retried on the next
    /// reconnect rather than rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InvalidTopicPattern`] for a malformed pattern.
    pub async fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<SubscriptionHandle> {
        let pattern = TopicPattern::parse(pattern)?;
        let _broker = self.inner.broker.lock().await;
        let (id, first) = self.inner.registry.insert(pattern.clone(), handler);

        if first && self.state().is_connected() {
            if let Err(err) = self.inner.transport.subscribe(pattern.as_str(), self.inner.qos).await {
                warn!(pattern = %pattern, error = %err, "Broker subscribe failed, will retry on reconnect");
            }
        }
        info!(pattern = %pattern, "Subscribed");

        Ok(SubscriptionHandle {
            id,
            pattern,
            bus: self.clone(),
        })
    }

    /// Remove every handler registered for `pattern`.
    pub async fn unsubscribe(&self, pattern: &str) -> Result<usize> {
        let _broker = self.inner.broker.lock().await;
        let removed = self.inner.registry.remove_pattern(pattern);
        if removed > 0 && self.state().is_connected() {
            self.inner.transport.unsubscribe(pattern).await?;
        }
        info!(pattern, removed, "Unsubscribed");
        Ok(removed)
    }

    /// Publish to a concrete topic.
    ///
    /// # Errors
    ///
    /// Fails fast with [`TransportError::NotConnected`] while disconnected;
    /// nothing is queued.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()> {
        validate_topic(topic)?;
        if !self.state().is_connected() {
            return Err(TransportError::NotConnected.into());
        }
        self.inner.transport.publish(topic, payload, options).await
    }

    /// Decode one inbound message and hand it to every matching handler.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let handlers = self.inner.registry.matching(topic);
        if handlers.is_empty() {
            debug!(topic, "No subscriber for topic");
            return 0;
        }

        let message = match codec::decode(topic, payload) {
            Ok(message) => message,
            Err(err) => {
                warn!(topic, error = %err, "Dropping malformed payload");
                return 0;
            }
        };

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(topic, &message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(topic, error = %err, "Handler failed"),
                Err(_) => error!(topic, "Handler panicked"),
            }
        }
        delivered
    }

    /// Ask a running [`run`](Self::run) loop to stop.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }

    /// Drive `stream` until shutdown, stream closure or retry exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::RetriesExhausted`] after `max_retries`
    /// consecutive failed connection attempts.
    pub async fn run<S: TransportStream>(&self, stream: S) -> Result<()> {
        let result = self.drive(stream).await;
        if let Some(task) = self.inner.resubscriber.lock().take() {
            task.abort();
        }
        result
    }

    async fn drive<S: TransportStream>(&self, mut stream: S) -> Result<()> {
        let mut backoff = Backoff::new(self.inner.reconnection.clone());
        self.set_state(ConnectionState::Connecting);

        loop {
            if !self.establish(&mut stream, &mut backoff).await? {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            loop {
                let event = tokio::select! {
                    () = self.inner.shutdown.notified() => {
                        info!("Topic bus shutting down");
                        self.set_state(ConnectionState::Disconnected);
                        return Ok(());
                    }
                    event = stream.next_event() => event,
                };

                match event {
                    Some(TransportEvent::Message { topic, payload }) => {
                        self.dispatch(&topic, &payload);
                    }
                    Some(TransportEvent::Connected) => {
                        self.set_state(ConnectionState::Connected);
                        self.spawn_resubscribe();
                    }
                    Some(TransportEvent::Disconnected { reason }) => {
                        warn!(reason = %reason, "Broker connection lost");
                        self.set_state(ConnectionState::Reconnecting);
                        break;
                    }
                    None => {
                        info!("Transport stream closed");
                        self.set_state(ConnectionState::Disconnected);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Connect with backoff. Returns false if shutdown was requested.
    async fn establish<S: TransportStream>(&self, stream: &mut S, backoff: &mut Backoff) -> Result<bool> {
        loop {
            let limit = backoff.connect_timeout();
            let attempt = tokio::select! {
                () = self.inner.shutdown.notified() => return Ok(false),
                attempt = connect_once(stream, limit) => attempt,
            };

            match attempt {
                Ok(()) => {
                    info!(transport = self.inner.transport.name(), "Connected to broker");
                    backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    self.spawn_resubscribe();
                    return Ok(true);
                }
                Err(err) => warn!(error = %err, attempt = backoff.failures() + 1, "Connect failed"),
            }

            backoff.record_failure();
            if backoff.exhausted() {
                let attempts = backoff.failures();
                error!(attempts, "Giving up on broker connection");
                self.set_state(ConnectionState::Disconnected);
                return Err(TransportError::RetriesExhausted { attempts }.into());
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");
            tokio::select! {
                () = self.inner.shutdown.notified() => return Ok(false),
                () = sleep(delay) => {}
            }
        }
    }

    /// Re-request every registered pattern on a separate task, replacing
    /// any resubscription still in flight from an earlier connect.
    fn spawn_resubscribe(&self) {
        let bus = self.clone();
        let task = tokio::spawn(async move { bus.resubscribe_all().await });
        if let Some(previous) = self.inner.resubscriber.lock().replace(task) {
            previous.abort();
        }
    }

    async fn resubscribe_all(&self) {
        let _broker = self.inner.broker.lock().await;
        if !self.state().is_connected() {
            return;
        }
        let patterns = self.inner.registry.patterns();
        if patterns.is_empty() {
            return;
        }
        debug!(patterns = patterns.len(), "Resubscribing");
        for pattern in patterns {
            if let Err(err) = self.inner.transport.subscribe(pattern.as_str(), self.inner.qos).await {
                warn!(pattern = %pattern, error = %err, "Resubscribe failed");
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = %current, to = %next, "Connection state changed");
            *current = next;
            true
        });
    }
}

/// One connect attempt bounded by `limit`.
async fn connect_once<S: TransportStream>(stream: &mut S, limit: Duration) -> Result<()> {
    timeout(limit, stream.connect())
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })?
}

#[async_trait]
impl Publisher for TopicBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()> {
        TopicBus::publish(self, topic, payload, options).await
    }
}
