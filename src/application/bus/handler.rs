use crate::domain::message::InboundMessage;
use crate::error::Result;

/// Receives decoded messages for a subscription.
///
/// Handlers run on the bus task and must not block; anything slow belongs
/// on a queue owned by the handler.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, topic: &str, message: &InboundMessage) -> Result<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(&str, &InboundMessage) -> Result<()> + Send + Sync,
{
    fn handle(&self, topic: &str, message: &InboundMessage) -> Result<()> {
        self(topic, message)
    }
}
