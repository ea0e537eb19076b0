//! Outbound message publishing.

use async_trait::async_trait;
use serde::Serialize;

use super::transport::PublishOptions;
use crate::error::Result;

/// Anything that can put a payload on a topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, options: PublishOptions) -> Result<()>;
}

/// Serialize `value` as JSON and publish it.
pub async fn publish_json<T>(
    publisher: &dyn Publisher,
    topic: &str,
    value: &T,
    options: PublishOptions,
) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value)?;
    publisher.publish(topic, payload, options).await
}
