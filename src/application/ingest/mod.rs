//! Telemetry ingestion.
//!
//! The [`Ingestor`] is a bus handler that only enqueues. Each source id is
//! pinned to one shard, a single task draining a FIFO queue, so readings
//! from one source are processed in arrival order while different sources
//! proceed in parallel. The [`IngestPipeline`] does the per-message work:
//! record history, push observer updates, evaluate alerts.

mod series;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use series::SeriesStore;

use crate::application::alert::{AlertEngine, Signal};
use crate::application::bus::{MessageHandler, SubscriptionHandle, TopicBus};
use crate::application::hub::BroadcastHub;
use crate::domain::analytics::peak_demand;
use crate::domain::equipment::EquipmentStatus;
use crate::domain::event::{EnergyUpdate, ObserverEvent, ZoneUpdate};
use crate::domain::message::InboundMessage;
use crate::domain::reading::{MetricKind, Reading};
use crate::domain::topic::topics;
use crate::error::{Error, Result};
use crate::infrastructure::config::ingest::IngestConfig;
use crate::port::outbound::directory::Directory;

/// Per-message processing shared by all shards.
pub struct IngestPipeline {
    series: Arc<SeriesStore>,
    alerts: Arc<AlertEngine>,
    hub: Arc<BroadcastHub>,
    directory: Arc<dyn Directory>,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(
        series: Arc<SeriesStore>,
        alerts: Arc<AlertEngine>,
        hub: Arc<BroadcastHub>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            series,
            alerts,
            hub,
            directory,
        }
    }

    #[must_use]
    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub async fn process(&self, message: InboundMessage) {
        match message {
            InboundMessage::Reading(reading) => self.on_reading(reading).await,
            InboundMessage::EquipmentStatus(status) => self.on_status(status).await,
            other => debug!(source = ?other.source_id(), "Ignoring non-telemetry message"),
        }
    }

    async fn on_reading(&self, reading: Reading) {
        self.series.record(reading.clone());

        let event = if reading.metric_kind == MetricKind::Energy {
            let window = self.series.snapshot(&reading.device_id, MetricKind::Energy);
            ObserverEvent::EnergyUpdate(EnergyUpdate {
                source_id: reading.device_id.clone(),
                power_kw: reading.value,
                reading_at: reading.timestamp,
                demand: peak_demand(&window),
            })
        } else {
            ObserverEvent::ZoneUpdate(ZoneUpdate {
                source_id: reading.device_id.clone(),
                metric: reading.metric_kind,
                value: reading.value,
                unit: reading.unit.clone(),
                reading_at: reading.timestamp,
            })
        };
        self.emit(&reading.device_id, event);

        if let Err(err) = self.alerts.evaluate(Signal::from_reading(&reading)).await {
            error!(source = %reading.device_id, kind = %reading.metric_kind.as_str(), error = %err, "Alert evaluation failed");
        }
    }

    async fn on_status(&self, status: EquipmentStatus) {
        self.emit(&status.equipment_id, ObserverEvent::EquipmentStatus(status.clone()));

        let signal = Signal::fault(status.equipment_id.clone(), status.is_fault(), status.timestamp);
        if let Err(err) = self.alerts.evaluate(signal).await {
            error!(equipment = %status.equipment_id, error = %err, "Fault evaluation failed");
        }

        if let Some(power_kw) = status.power_kw {
            let reading = Reading::new(status.equipment_id, MetricKind::Energy, power_kw, status.timestamp);
            self.on_reading(reading).await;
        }
    }

    fn emit(&self, source_id: &str, event: ObserverEvent) {
        let rooms = self.directory.rooms_for(source_id);
        if rooms.is_empty() {
            debug!(source = source_id, event = event.name(), "No rooms for source");
            return;
        }
        self.hub.emit_to_rooms(&rooms, event);
    }
}

/// Sharded front door of the pipeline.
pub struct Ingestor {
    shards: Vec<mpsc::Sender<InboundMessage>>,
}

impl Ingestor {
    /// Spawn one worker per configured shard.
    pub fn start(pipeline: Arc<IngestPipeline>, config: &IngestConfig) -> (Arc<Self>, Vec<JoinHandle<()>>) {
        let count = config.shards.max(1);
        let mut shards = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);

        for shard in 0..count {
            let (tx, mut rx) = mpsc::channel::<InboundMessage>(config.queue_capacity.max(1));
            let pipeline = Arc::clone(&pipeline);
            workers.push(tokio::spawn(async move {
                debug!(shard, "Ingest shard started");
                while let Some(message) = rx.recv().await {
                    pipeline.process(message).await;
                }
                debug!(shard, "Ingest shard stopped");
            }));
            shards.push(tx);
        }

        info!(shards = count, queue_capacity = config.queue_capacity, "Ingestor started");
        (Arc::new(Self { shards }), workers)
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard that owns `source_id`.
    #[must_use]
    pub fn shard_for(&self, source_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        source_id.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Subscribe to sensor readings and equipment status.
    pub async fn attach(self: &Arc<Self>, bus: &TopicBus) -> Result<Vec<SubscriptionHandle>> {
        let handler: Arc<dyn MessageHandler> = self.clone();
        let mut handles = Vec::with_capacity(2);
        for filter in [topics::SENSOR_FILTER, topics::HVAC_STATUS_FILTER] {
            handles.push(bus.subscribe(filter, Arc::clone(&handler)).await?);
        }
        Ok(handles)
    }

    fn enqueue(&self, message: InboundMessage) -> Result<()> {
        let Some(source) = message.source_id() else {
            return Ok(());
        };
        let shard = self.shard_for(source);
        match self.shards[shard].try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                warn!(shard, source = ?message.source_id(), "Ingest queue full, rejecting message");
                Err(Error::QueueFull { queue: "ingest" })
            }
            Err(TrySendError::Closed(_)) => {
                debug!(shard, "Ingest shard closed");
                Ok(())
            }
        }
    }
}

impl MessageHandler for Ingestor {
    fn handle(&self, _topic: &str, message: &InboundMessage) -> Result<()> {
        match message {
            InboundMessage::Reading(_) | InboundMessage::EquipmentStatus(_) => self.enqueue(message.clone()),
            _ => Ok(()),
        }
    }
}
