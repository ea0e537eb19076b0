//! Operator control requests.

use std::sync::Arc;

use tracing::info;

use crate::application::ratelimit::{ActionClass, Identity, RateLimiter};
use crate::domain::equipment::{CommandOrigin, ControlAction, ControlCommand};
use crate::domain::topic::topics;
use crate::error::{Error, Result};
use crate::port::outbound::publisher::{publish_json, Publisher};
use crate::port::outbound::transport::{PublishOptions, QoS};

/// Admits operator commands against the control policy and publishes them.
pub struct ControlGateway {
    limiter: Arc<RateLimiter>,
    publisher: Arc<dyn Publisher>,
}

impl ControlGateway {
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>, publisher: Arc<dyn Publisher>) -> Self {
        Self { limiter, publisher }
    }

    /// Publish `action` for `equipment_id` on behalf of `identity`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCommand`] for a malformed action or equipment id,
    /// [`Error::Throttled`] when the control policy denies the request.
    pub async fn request(
        &self,
        identity: &Identity,
        equipment_id: &str,
        action: ControlAction,
    ) -> Result<ControlCommand> {
        if equipment_id.is_empty() || equipment_id.contains(['/', '+', '#']) {
            return Err(Error::InvalidCommand(format!("invalid equipment id '{equipment_id}'")));
        }
        action.validate()?;

        let admission = self.limiter.admit(identity, ActionClass::Control).await;
        let admission = admission.into_result()?;

        let command = ControlCommand::new(
            equipment_id,
            action,
            CommandOrigin::Operator {
                identity: identity.key().to_string(),
            },
        );
        publish_json(
            &*self.publisher,
            &topics::equipment_control(equipment_id),
            &command,
            PublishOptions::qos(QoS::AtLeastOnce),
        )
        .await?;

        info!(
            equipment = equipment_id,
            action = %command.action,
            by = identity.key(),
            remaining = admission.remaining,
            degraded = admission.degraded,
            "Control command published"
        );
        Ok(command)
    }
}
