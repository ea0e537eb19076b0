//! Publisher that records instead of sending.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::transport::PublishedMessage;
use crate::error::Result;
use crate::port::outbound::publisher::Publisher;
use crate::port::outbound::transport::PublishOptions;

#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().clone()
    }

    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.topic.clone()).collect()
    }

    /// JSON payloads published to exactly `topic`, oldest first.
    #[must_use]
    pub fn json_on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .map(PublishedMessage::json)
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()> {
        self.messages.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            options,
        });
        Ok(())
    }
}
