//! Broker transport port.
//!
//! A transport is split the way MQTT clients are: a cloneable request side
//! ([`Transport`]) and a single event stream ([`TransportStream`]) that must
//! be polled for anything to happen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Delivery guarantee requested from the broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// Map an MQTT numeric level; anything above 2 is clamped.
    #[must_use]
    pub const fn from_level(level: u8) -> Self {
        match level {
            0 => Self::AtMostOnce,
            1 => Self::AtLeastOnce,
            _ => Self::ExactlyOnce,
        }
    }

    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub qos: QoS,
    pub retain: bool,
}

impl PublishOptions {
    #[must_use]
    pub const fn qos(qos: QoS) -> Self {
        Self { qos, retain: false }
    }

    #[must_use]
    pub const fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

/// Event surfaced by a [`TransportStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Disconnected { reason: String },
}

/// Request side of a broker connection.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn subscribe(&self, filter: &str, qos: QoS) -> Result<()>;

    async fn unsubscribe(&self, filter: &str) -> Result<()>;

    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Event side of a broker connection.
#[async_trait]
pub trait TransportStream: Send {
    /// Drive the connection until the broker acknowledges it.
    async fn connect(&mut self) -> Result<()>;

    /// Next event, or `None` when the stream is permanently closed.
    async fn next_event(&mut self) -> Option<TransportEvent>;
}
