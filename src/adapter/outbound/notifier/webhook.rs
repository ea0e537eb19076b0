//! Webhook notifier.
//!
//! Posts alert events as JSON to a configured URL. Delivery runs on a
//! background worker fed by an unbounded channel, so `notify` never waits
//! on the network. Events below the severity floor are dropped before they
//! are queued.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::alert::{Alert, AlertId, Severity};
use crate::infrastructure::config::notifications::WebhookConfig;
use crate::port::outbound::notifier::{Event, Notifier};

/// Body posted to the webhook.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookPayload<'a> {
    AlertRaised { alert: &'a Alert },
    AlertResolved { alert: &'a Alert },
    ProtectiveAction { equipment_id: &'a str, alert_id: AlertId },
}

/// Payload for `event`, or `None` when it is filtered out.
fn payload_for(event: &Event, min_severity: Severity) -> Option<WebhookPayload<'_>> {
    match event {
        Event::AlertRaised(alert) if alert.severity >= min_severity => {
            Some(WebhookPayload::AlertRaised { alert })
        }
        Event::AlertResolved(alert) if alert.severity >= min_severity => {
            Some(WebhookPayload::AlertResolved { alert })
        }
        Event::ProtectiveAction {
            equipment_id,
            alert_id,
        } => Some(WebhookPayload::ProtectiveAction {
            equipment_id,
            alert_id: *alert_id,
        }),
        _ => None,
    }
}

pub struct WebhookNotifier {
    sender: mpsc::UnboundedSender<Event>,
    min_severity: Severity,
}

impl WebhookNotifier {
    /// Spawn the delivery worker. Returns `None` when no URL is configured.
    #[must_use]
    pub fn spawn(config: &WebhookConfig) -> Option<Self> {
        let url = config.url.clone()?;
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                error!(error = %err, "Could not build webhook client");
                return None;
            }
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(webhook_worker(client, url, config.min_severity, receiver));
        Some(Self {
            sender,
            min_severity: config.min_severity,
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: Event) {
        if payload_for(&event, self.min_severity).is_none() {
            return;
        }
        if self.sender.send(event).is_err() {
            warn!("Webhook notifier channel closed");
        }
    }
}

async fn webhook_worker(
    client: reqwest::Client,
    url: String,
    min_severity: Severity,
    mut receiver: mpsc::UnboundedReceiver<Event>,
) {
    info!(min_severity = %min_severity, "Webhook notifier started");

    while let Some(event) = receiver.recv().await {
        let Some(payload) = payload_for(&event, min_severity) else {
            continue;
        };
        match client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "Webhook delivered");
            }
            Ok(response) => warn!(status = %response.status(), "Webhook rejected"),
            Err(err) => error!(error = %err, "Webhook delivery failed"),
        }
    }

    warn!("Webhook notifier worker shutting down");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::alert::AlertKind;

    fn alert(severity: Severity) -> Alert {
        Alert::open("t-1", AlertKind::Temperature, severity, 90.0, 80.0, Utc::now())
    }

    #[test]
    fn severity_floor_filters_alerts() {
        let low = Event::AlertRaised(alert(Severity::Low));
        let critical = Event::AlertRaised(alert(Severity::Critical));
        assert!(payload_for(&low, Severity::High).is_none());
        assert!(payload_for(&critical, Severity::High).is_some());
    }

    #[test]
    fn transport_events_are_not_posted() {
        let event = Event::TransportDegraded { reason: "x".into() };
        assert!(payload_for(&event, Severity::Low).is_none());
    }

    #[test]
    fn payload_is_tagged() {
        let raised = alert(Severity::High);
        let json = serde_json::to_value(WebhookPayload::AlertRaised { alert: &raised }).unwrap();
        assert_eq!(json["type"], "alert_raised");
        assert_eq!(json["alert"]["severity"], "high");
    }

    #[test]
    fn filtered_events_are_never_queued() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let notifier = WebhookNotifier {
            sender,
            min_severity: Severity::High,
        };

        notifier.notify(Event::AlertRaised(alert(Severity::Low)));
        notifier.notify(Event::TransportDegraded { reason: "x".into() });
        notifier.notify(Event::AlertRaised(alert(Severity::Critical)));

        let queued = receiver.try_recv().unwrap();
        assert!(matches!(queued, Event::AlertRaised(a) if a.severity == Severity::Critical));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn missing_url_disables_notifier() {
        assert!(WebhookNotifier::spawn(&WebhookConfig::default()).is_none());
    }
}
