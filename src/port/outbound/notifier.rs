//! Notifier port for operational notifications.
//!
//! Notifications are fire-and-forget: raising them never blocks alert
//! evaluation or the ingestion path.

use crate::domain::alert::{Alert, AlertId};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new alert opened.
    AlertRaised(Alert),
    /// An alert was resolved, manually or automatically.
    AlertResolved(Alert),
    /// A protective command was issued in response to a critical alert.
    ProtectiveAction {
        equipment_id: String,
        alert_id: AlertId,
    },
    /// The broker connection was lost.
    TransportDegraded { reason: String },
}

/// Trait for notification handlers.
///
/// `notify` must return quickly; slow delivery (HTTP) spawns a task.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}
