//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for the log and, with the `webhook`
//! feature, for HTTP webhooks.

use tracing::{info, warn};

use crate::port::outbound::notifier::{Event, Notifier};

#[cfg(feature = "webhook")]
pub mod webhook;

/// Writes every event to the structured log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::AlertRaised(alert) => warn!(
                target: "edifice::notify",
                alert = %alert.id,
                source = %alert.source_id,
                kind = %alert.kind,
                severity = %alert.severity,
                value = alert.trigger_value,
                threshold = alert.threshold,
                "Alert raised"
            ),
            Event::AlertResolved(alert) => info!(
                target: "edifice::notify",
                alert = %alert.id,
                source = %alert.source_id,
                by = alert.resolved_by.as_deref().unwrap_or("unknown"),
                "Alert resolved"
            ),
            Event::ProtectiveAction {
                equipment_id,
                alert_id,
            } => warn!(
                target: "edifice::notify",
                equipment = %equipment_id,
                alert = %alert_id,
                "Protective shutdown issued"
            ),
            Event::TransportDegraded { reason } => {
                warn!(target: "edifice::notify", reason = %reason, "Broker connection degraded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::port::outbound::notifier::{NotifierRegistry, NullNotifier};

    struct CountingNotifier {
        count: Arc<AtomicUsize>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _event: Event) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn degraded() -> Event {
        Event::TransportDegraded {
            reason: "connection reset".into(),
        }
    }

    #[test]
    fn registry_fans_out_to_every_notifier() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(CountingNotifier { count: count.clone() }));
        registry.register(Box::new(CountingNotifier { count: count.clone() }));
        registry.register(Box::new(LogNotifier));

        registry.notify_all(degraded());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn null_notifier_accepts_events() {
        NullNotifier.notify(degraded());
        assert!(NotifierRegistry::default().is_empty());
    }
}
