//! Threshold evaluation and alert lifecycle.
//!
//! The engine keeps at most one open alert per `{source, kind}`. Lookup and
//! update for a key happen under that key's async lock, so concurrent
//! readings from one source can neither double-create nor lose a trigger
//! update. Side effects (observer events, the `alerts/{id}` notice,
//! notifications, protective commands) run after the lock is released.

mod threshold;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use threshold::{Breach, SeverityBands, ThresholdRule, ThresholdTable};

use crate::application::hub::BroadcastHub;
use crate::domain::alert::{Alert, AlertId, AlertKey, AlertKind, Severity, Transition};
use crate::domain::equipment::{CommandOrigin, ControlAction, ControlCommand};
use crate::domain::event::ObserverEvent;
use crate::domain::reading::Reading;
use crate::domain::topic::topics;
use crate::error::{AlertError, Result};
use crate::infrastructure::config::alerts::AlertsConfig;
use crate::port::outbound::alert::AlertRepository;
use crate::port::outbound::directory::Directory;
use crate::port::outbound::notifier::{Event, NotifierRegistry};
use crate::port::outbound::publisher::{publish_json, Publisher};
use crate::port::outbound::transport::{PublishOptions, QoS};

/// Actor recorded on automatic resolutions.
pub const SYSTEM_ACTOR: &str = "system";
/// Resolution text recorded on automatic resolutions.
pub const AUTO_RESOLUTION: &str = "auto-resolved: reading returned to normal range";

/// One observation to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub source_id: String,
    pub kind: AlertKind,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl Signal {
    #[must_use]
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            source_id: reading.device_id.clone(),
            kind: reading.metric_kind.into(),
            value: reading.value,
            observed_at: reading.timestamp,
        }
    }

    /// Equipment fault flag: 1.0 while faulted, 0.0 otherwise.
    #[must_use]
    pub fn fault(equipment_id: impl Into<String>, faulted: bool, observed_at: DateTime<Utc>) -> Self {
        Self {
            source_id: equipment_id.into(),
            kind: AlertKind::EquipmentFault,
            value: if faulted { 1.0 } else { 0.0 },
            observed_at,
        }
    }
}

/// Result of evaluating one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// No rule for this kind, or a non-finite value.
    Untracked,
    /// Within the safe band with nothing open.
    Normal,
    Created(Alert),
    /// An alert was already open; only its trigger value changed.
    Deduplicated(Alert),
    AutoResolved(Alert),
}

/// Lifecycle switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub auto_resolve: bool,
    pub protective_action: bool,
}

impl From<&AlertsConfig> for AlertPolicy {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            auto_resolve: config.auto_resolve,
            protective_action: config.protective_action,
        }
    }
}

type Slot = Arc<Mutex<Option<Alert>>>;

pub struct AlertEngine {
    thresholds: ThresholdTable,
    policy: AlertPolicy,
    repository: Arc<dyn AlertRepository>,
    directory: Arc<dyn Directory>,
    publisher: Arc<dyn Publisher>,
    hub: Arc<BroadcastHub>,
    notifiers: Arc<NotifierRegistry>,
    open: DashMap<AlertKey, Slot>,
    index: DashMap<AlertId, AlertKey>,
}

impl AlertEngine {
    #[must_use]
    pub fn new(
        thresholds: ThresholdTable,
        policy: AlertPolicy,
        repository: Arc<dyn AlertRepository>,
        directory: Arc<dyn Directory>,
        publisher: Arc<dyn Publisher>,
        hub: Arc<BroadcastHub>,
        notifiers: Arc<NotifierRegistry>,
    ) -> Self {
        Self {
            thresholds,
            policy,
            repository,
            directory,
            publisher,
            hub,
            notifiers,
            open: DashMap::new(),
            index: DashMap::new(),
        }
    }

    fn slot(&self, key: &AlertKey) -> Slot {
        self.open.entry(key.clone()).or_default().clone()
    }

    /// Evaluate one signal against its threshold.
    pub async fn evaluate(&self, signal: Signal) -> Result<Evaluation> {
        let Some(rule) = self.thresholds.rule(signal.kind) else {
            return Ok(Evaluation::Untracked);
        };
        if !signal.value.is_finite() {
            return Ok(Evaluation::Untracked);
        }

        let key = AlertKey::new(signal.source_id.clone(), signal.kind);
        let slot = self.slot(&key);
        let mut open = slot.lock().await;

        let outcome = match (rule.check(signal.value), open.clone()) {
            (Some(_), Some(mut updated)) => {
                updated.record_trigger(signal.value);
                self.repository.update(&updated).await?;
                *open = Some(updated.clone());
                Evaluation::Deduplicated(updated)
            }
            (Some(breach), None) => {
                let alert = Alert::open(
                    signal.source_id.clone(),
                    signal.kind,
                    breach.severity,
                    signal.value,
                    breach.threshold,
                    signal.observed_at,
                );
                self.repository.insert(&alert).await?;
                self.index.insert(alert.id, key);
                *open = Some(alert.clone());
                Evaluation::Created(alert)
            }
            (None, Some(mut resolved)) if self.policy.auto_resolve => {
                resolved.resolve(SYSTEM_ACTOR, AUTO_RESOLUTION, Utc::now())?;
                self.repository.update(&resolved).await?;
                self.index.remove(&resolved.id);
                *open = None;
                Evaluation::AutoResolved(resolved)
            }
            (None, _) => Evaluation::Normal,
        };
        drop(open);

        match &outcome {
            Evaluation::Created(alert) => self.announce_new(alert).await,
            Evaluation::AutoResolved(alert) => {
                info!(alert = %alert.id, source = %alert.source_id, kind = %alert.kind, "Alert auto-resolved");
                self.announce_update(alert);
                self.notifiers.notify_all(Event::AlertResolved(alert.clone()));
            }
            Evaluation::Deduplicated(alert) => {
                debug!(alert = %alert.id, value = signal.value, "Open alert updated");
            }
            Evaluation::Normal | Evaluation::Untracked => {}
        }
        Ok(outcome)
    }

    /// Acknowledge an active alert.
    ///
    /// # Errors
    ///
    /// [`AlertError::NotFound`] for an unknown id, [`AlertError::StateConflict`]
    /// when the alert is resolved or acknowledged by someone else.
    pub async fn acknowledge(&self, id: AlertId, by: &str) -> Result<Alert> {
        let (alert, transition) = self
            .transition(id, |alert| alert.acknowledge(by, Utc::now()))
            .await?;
        if transition == Transition::Applied {
            info!(alert = %id, by, "Alert acknowledged");
            self.announce_update(&alert);
        }
        Ok(alert)
    }

    /// Resolve an open alert. Repeating the same resolution is a no-op.
    ///
    /// # Errors
    ///
    /// [`AlertError::NotFound`] for an unknown id, [`AlertError::StateConflict`]
    /// when already resolved with different text.
    pub async fn resolve(&self, id: AlertId, by: &str, resolution: &str) -> Result<Alert> {
        let (alert, transition) = self
            .transition(id, |alert| alert.resolve(by, resolution, Utc::now()))
            .await?;
        if transition == Transition::Applied {
            info!(alert = %id, by, "Alert resolved");
            self.announce_update(&alert);
            self.notifiers.notify_all(Event::AlertResolved(alert.clone()));
        }
        Ok(alert)
    }

    /// Open alerts as persisted.
    pub async fn open_alerts(&self) -> Result<Vec<Alert>> {
        self.repository.list_open().await
    }

    /// Load open alerts from the repository into the dedup index.
    ///
    /// When several open alerts share a key the newest one is kept.
    pub async fn restore(&self) -> Result<usize> {
        let mut restored = 0;
        for alert in self.repository.list_open().await? {
            let key = alert.key();
            let slot = self.slot(&key);
            let mut open = slot.lock().await;
            match open.as_ref() {
                Some(current) if current.created_at >= alert.created_at => {
                    warn!(kept = %current.id, skipped = %alert.id, "Duplicate open alert for key");
                    continue;
                }
                Some(current) => {
                    warn!(kept = %alert.id, skipped = %current.id, "Duplicate open alert for key");
                    self.index.remove(&current.id);
                }
                None => restored += 1,
            }
            self.index.insert(alert.id, key);
            *open = Some(alert);
        }
        info!(restored, "Open alerts restored");
        Ok(restored)
    }

    async fn transition<F>(&self, id: AlertId, op: F) -> Result<(Alert, Transition)>
    where
        F: FnOnce(&mut Alert) -> std::result::Result<Transition, AlertError>,
    {
        let key = self.index.get(&id).map(|entry| entry.value().clone());
        if let Some(key) = key {
            let slot = self.slot(&key);
            let mut open = slot.lock().await;
            if let Some(mut next) = open.clone().filter(|alert| alert.id == id) {
                let transition = op(&mut next)?;
                if transition == Transition::Applied {
                    self.repository.update(&next).await?;
                    if next.is_open() {
                        *open = Some(next.clone());
                    } else {
                        *open = None;
                        self.index.remove(&id);
                    }
                }
                return Ok((next, transition));
            }
        }

        let mut alert = self
            .repository
            .get(id)
            .await?
            .ok_or(AlertError::NotFound { id })?;
        let transition = op(&mut alert)?;
        if transition == Transition::Applied {
            self.repository.update(&alert).await?;
        }
        Ok((alert, transition))
    }

    async fn announce_new(&self, alert: &Alert) {
        info!(
            alert = %alert.id,
            source = %alert.source_id,
            kind = %alert.kind,
            severity = %alert.severity,
            value = alert.trigger_value,
            "Alert raised"
        );

        self.emit(ObserverEvent::AlertNew(alert.clone()), &alert.source_id);

        let topic = topics::alert(&alert.id.to_string());
        if let Err(err) =
            publish_json(&*self.publisher, &topic, alert, PublishOptions::qos(QoS::AtLeastOnce)).await
        {
            warn!(alert = %alert.id, error = %err, "Could not publish alert notice");
        }

        self.notifiers.notify_all(Event::AlertRaised(alert.clone()));

        if alert.severity == Severity::Critical && self.policy.protective_action {
            self.protect(alert).await;
        }
    }

    /// Publish a protective shutdown for the equipment serving the source.
    async fn protect(&self, alert: &Alert) {
        let Some(equipment_id) = self.directory.equipment_for(&alert.source_id) else {
            debug!(source = %alert.source_id, "No equipment mapped, skipping protective action");
            return;
        };

        let command = ControlCommand::new(
            equipment_id.clone(),
            ControlAction::Shutdown,
            CommandOrigin::AlertEngine { alert_id: alert.id },
        );
        let topic = topics::equipment_control(&equipment_id);
        match publish_json(&*self.publisher, &topic, &command, PublishOptions::qos(QoS::AtLeastOnce)).await {
            Ok(()) => {
                warn!(equipment = %equipment_id, alert = %alert.id, "Protective shutdown issued");
                self.notifiers.notify_all(Event::ProtectiveAction {
                    equipment_id,
                    alert_id: alert.id,
                });
            }
            Err(err) => {
                warn!(equipment = %equipment_id, alert = %alert.id, error = %err, "Protective shutdown failed");
            }
        }
    }

    fn announce_update(&self, alert: &Alert) {
        self.emit(ObserverEvent::AlertUpdate(alert.clone()), &alert.source_id);
    }

    /// Alerts go to the source's rooms, or to everyone when it has none.
    fn emit(&self, event: ObserverEvent, source_id: &str) {
        let rooms = self.directory.rooms_for(source_id);
        if rooms.is_empty() {
            self.hub.broadcast_all(event);
        } else {
            self.hub.emit_to_rooms(&rooms, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::{MemoryAlertRepository, StaticDirectory};
    use crate::domain::alert::AlertStatus;
    use crate::domain::reading::MetricKind;
    use crate::error::Error;
    use crate::infrastructure::config::directory::DirectoryEntry;
    use crate::testkit::publisher::RecordingPublisher;

    struct Fixture {
        engine: AlertEngine,
        repository: Arc<MemoryAlertRepository>,
        publisher: Arc<RecordingPublisher>,
    }

    fn fixture(policy: AlertPolicy) -> Fixture {
        let repository = Arc::new(MemoryAlertRepository::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let directory = Arc::new(StaticDirectory::new(vec![DirectoryEntry {
            source: "t-1".into(),
            building: "hq".into(),
            zone: Some("f1".into()),
            equipment: Some("ahu-1".into()),
        }]));
        let engine = AlertEngine::new(
            ThresholdTable::default(),
            policy,
            repository.clone(),
            directory,
            publisher.clone(),
            Arc::new(BroadcastHub::default()),
            Arc::new(NotifierRegistry::new()),
        );
        Fixture {
            engine,
            repository,
            publisher,
        }
    }

    fn default_policy() -> AlertPolicy {
        AlertPolicy {
            auto_resolve: true,
            protective_action: true,
        }
    }

    fn temp(value: f64) -> Signal {
        Signal::from_reading(&Reading::new("t-1", MetricKind::Temperature, value, Utc::now()))
    }

    #[tokio::test]
    async fn breach_creates_and_repeat_deduplicates() {
        let fx = fixture(default_policy());

        let Evaluation::Created(alert) = fx.engine.evaluate(temp(84.0)).await.unwrap() else {
            panic!("expected creation");
        };
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.threshold, 80.0);

        let Evaluation::Deduplicated(same) = fx.engine.evaluate(temp(85.5)).await.unwrap() else {
            panic!("expected dedup");
        };
        assert_eq!(same.id, alert.id);
        assert_eq!(same.trigger_value, 85.5);
        assert_eq!(fx.repository.list_open().await.unwrap().len(), 1);
        assert_eq!(fx.publisher.topics(), vec![format!("alerts/{}", alert.id)]);
    }

    #[tokio::test]
    async fn normal_reading_auto_resolves() {
        let fx = fixture(default_policy());
        fx.engine.evaluate(temp(84.0)).await.unwrap();

        let Evaluation::AutoResolved(alert) = fx.engine.evaluate(temp(72.0)).await.unwrap() else {
            panic!("expected auto-resolution");
        };
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.resolved_by.as_deref(), Some(SYSTEM_ACTOR));

        assert!(matches!(
            fx.engine.evaluate(temp(84.0)).await.unwrap(),
            Evaluation::Created(_)
        ));
    }

    #[tokio::test]
    async fn auto_resolve_can_be_disabled() {
        let fx = fixture(AlertPolicy {
            auto_resolve: false,
            protective_action: false,
        });
        fx.engine.evaluate(temp(84.0)).await.unwrap();
        assert_eq!(fx.engine.evaluate(temp(72.0)).await.unwrap(), Evaluation::Normal);
        assert_eq!(fx.engine.open_alerts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn critical_alert_issues_protective_shutdown() {
        let fx = fixture(default_policy());
        let Evaluation::Created(alert) = fx.engine.evaluate(temp(95.0)).await.unwrap() else {
            panic!("expected creation");
        };
        assert_eq!(alert.severity, Severity::Critical);

        let commands = fx.publisher.json_on("equipment/ahu-1/control");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["action"]["type"], "shutdown");
        assert_eq!(commands[0]["origin"]["kind"], "alert_engine");
        assert_eq!(commands[0]["origin"]["alert_id"], alert.id.to_string());
    }

    #[tokio::test]
    async fn acknowledged_alert_still_deduplicates() {
        let fx = fixture(default_policy());
        let Evaluation::Created(alert) = fx.engine.evaluate(temp(84.0)).await.unwrap() else {
            panic!("expected creation");
        };
        fx.engine.acknowledge(alert.id, "ops").await.unwrap();

        let Evaluation::Deduplicated(same) = fx.engine.evaluate(temp(86.0)).await.unwrap() else {
            panic!("expected dedup");
        };
        assert_eq!(same.status, AlertStatus::Acknowledged);
    }

    #[tokio::test]
    async fn resolve_conflicts_carry_current_state() {
        let fx = fixture(default_policy());
        let Evaluation::Created(alert) = fx.engine.evaluate(temp(84.0)).await.unwrap() else {
            panic!("expected creation");
        };

        fx.engine.resolve(alert.id, "ops", "fixed").await.unwrap();
        let again = fx.engine.resolve(alert.id, "ops", "fixed").await.unwrap();
        assert_eq!(again.status, AlertStatus::Resolved);

        let err = fx.engine.resolve(alert.id, "ops", "other").await.unwrap_err();
        let Error::Alert(err) = err else {
            panic!("expected alert error");
        };
        assert_eq!(err.current().unwrap().resolution.as_deref(), Some("fixed"));

        assert!(fx.engine.acknowledge(alert.id, "ops").await.is_err());
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let fx = fixture(default_policy());
        let err = fx.engine.acknowledge(AlertId::new(), "ops").await.unwrap_err();
        assert!(matches!(err, Error::Alert(AlertError::NotFound { .. })));
    }

    #[tokio::test]
    async fn untracked_kinds_never_alert() {
        let fx = fixture(default_policy());
        let signal = Signal::from_reading(&Reading::new("o-1", MetricKind::Occupancy, 900.0, Utc::now()));
        assert_eq!(fx.engine.evaluate(signal).await.unwrap(), Evaluation::Untracked);
    }

    #[tokio::test]
    async fn restore_rebuilds_dedup_index() {
        let fx = fixture(default_policy());
        let existing = Alert::open("t-1", AlertKind::Temperature, Severity::Low, 81.0, 80.0, Utc::now());
        fx.repository.insert(&existing).await.unwrap();

        assert_eq!(fx.engine.restore().await.unwrap(), 1);
        let Evaluation::Deduplicated(same) = fx.engine.evaluate(temp(82.0)).await.unwrap() else {
            panic!("expected dedup against restored alert");
        };
        assert_eq!(same.id, existing.id);
    }
}
