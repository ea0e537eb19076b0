//! Composition root: builds every service from configuration and runs them
//! against a broker connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::adapter::inbound::websocket::{ObserverServer, SocketSettings};
use crate::adapter::outbound::memory::{MemoryAlertRepository, MemoryStore, StaticDirectory};
use crate::adapter::outbound::mqtt;
use crate::adapter::outbound::notifier::LogNotifier;
use crate::application::alert::{AlertEngine, AlertPolicy};
use crate::application::bus::TopicBus;
use crate::application::cache::Cache;
use crate::application::control::ControlGateway;
use crate::application::hub::{BroadcastHub, HubSettings};
use crate::application::ingest::{IngestPipeline, Ingestor, SeriesStore};
use crate::application::ratelimit::{PolicySet, RateLimiter};
use crate::application::report::EnergyReporter;
use crate::domain::connection::ConnectionState;
use crate::domain::event::{ObserverEvent, SystemStatus};
use crate::error::Result;
use crate::infrastructure::config::cache::{CacheBackend, CacheConfig};
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::directory::Directory;
use crate::port::outbound::notifier::{Event, NotifierRegistry};
use crate::port::outbound::publisher::Publisher;
use crate::port::outbound::store::CacheStore;
use crate::port::outbound::transport::{QoS, Transport, TransportStream};

/// Forecast points included in energy reports.
const REPORT_HORIZON: usize = 12;

/// Build notifier registry from configuration.
pub(crate) fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    if config.notifications.log {
        registry.register(Box::new(LogNotifier));
    }

    #[cfg(feature = "webhook")]
    {
        use crate::adapter::outbound::notifier::webhook::WebhookNotifier;

        if let Some(webhook) = WebhookNotifier::spawn(&config.notifications.webhook) {
            registry.register(Box::new(webhook));
            info!(min_severity = %config.notifications.webhook.min_severity, "Webhook notifier enabled");
        }
    }

    registry
}

/// Open the configured cache store.
///
/// The memory store is also returned on its own so its expiry sweep can be
/// scheduled. An unreachable Redis falls back to memory.
pub(crate) async fn build_store(config: &CacheConfig) -> (Arc<dyn CacheStore>, Option<Arc<MemoryStore>>) {
    if config.backend == CacheBackend::Redis {
        #[cfg(feature = "redis")]
        {
            use crate::adapter::outbound::redis::RedisStore;

            match config.redis_url.as_deref() {
                Some(url) => match RedisStore::connect(url).await {
                    Ok(store) => return (Arc::new(store), None),
                    Err(err) => warn!(error = %err, "Redis unavailable, using in-memory cache"),
                },
                None => warn!("EDIFICE_REDIS_URL not set, using in-memory cache"),
            }
        }
        #[cfg(not(feature = "redis"))]
        {
            warn!("Built without the redis feature, using in-memory cache");
        }
    }

    let memory = Arc::new(MemoryStore::new());
    (memory.clone(), Some(memory))
}

/// Every long-lived service, wired and ready to run.
pub struct Service {
    config: Config,
    bus: TopicBus,
    hub: Arc<BroadcastHub>,
    alerts: Arc<AlertEngine>,
    cache: Arc<Cache>,
    limiter: Arc<RateLimiter>,
    control: Arc<ControlGateway>,
    reports: Arc<EnergyReporter>,
    pipeline: Arc<IngestPipeline>,
    notifiers: Arc<NotifierRegistry>,
    memory: Option<Arc<MemoryStore>>,
}

impl Service {
    /// Wire services with notifiers taken from configuration.
    pub async fn build(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let notifiers = build_notifier_registry(&config);
        Self::build_with(config, transport, notifiers).await
    }

    /// Wire services around an explicit notifier registry.
    pub async fn build_with(
        config: Config,
        transport: Arc<dyn Transport>,
        notifiers: NotifierRegistry,
    ) -> Result<Self> {
        config.validate()?;

        let (store, memory) = build_store(&config.cache).await;
        let cache = Arc::new(Cache::new(
            store,
            config.cache.namespace.clone(),
            Duration::from_millis(config.cache.request_timeout_ms),
        ));
        let limiter = Arc::new(RateLimiter::new(
            Arc::clone(&cache),
            PolicySet::from_config(&config.rate_limit),
        ));

        let bus = TopicBus::new(transport, config.reconnection.clone(), QoS::from_level(config.mqtt.qos));
        let publisher: Arc<dyn Publisher> = Arc::new(bus.clone());
        let hub = Arc::new(BroadcastHub::new(HubSettings::from(&config.hub)));
        let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::new(config.directory.clone()));
        let notifiers = Arc::new(notifiers);

        let alerts = Arc::new(AlertEngine::new(
            config.alerts.thresholds.clone(),
            AlertPolicy::from(&config.alerts),
            Arc::new(MemoryAlertRepository::new()),
            Arc::clone(&directory),
            Arc::clone(&publisher),
            Arc::clone(&hub),
            Arc::clone(&notifiers),
        ));

        let series = Arc::new(SeriesStore::new(config.ingest.history_len));
        let pipeline = Arc::new(IngestPipeline::new(
            Arc::clone(&series),
            Arc::clone(&alerts),
            Arc::clone(&hub),
            directory,
        ));
        let reports = Arc::new(EnergyReporter::new(
            series,
            Arc::clone(&cache),
            Duration::from_secs(config.cache.default_ttl_secs),
            REPORT_HORIZON,
        ));
        let control = Arc::new(ControlGateway::new(Arc::clone(&limiter), publisher));

        info!(
            cache = cache.backend(),
            notifiers = notifiers.len(),
            directory = config.directory.len(),
            "Services wired"
        );

        Ok(Self {
            config,
            bus,
            hub,
            alerts,
            cache,
            limiter,
            control,
            reports,
            pipeline,
            notifiers,
            memory,
        })
    }

    #[must_use]
    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    #[must_use]
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    #[must_use]
    pub fn alerts(&self) -> &Arc<AlertEngine> {
        &self.alerts
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    #[must_use]
    pub fn control(&self) -> &Arc<ControlGateway> {
        &self.control
    }

    #[must_use]
    pub fn reports(&self) -> &Arc<EnergyReporter> {
        &self.reports
    }

    #[must_use]
    pub fn series(&self) -> &SeriesStore {
        self.pipeline.series()
    }

    /// Current transport state as observers see it.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            transport: self.bus.state(),
            detail: None,
        }
    }

    /// Run until the bus stops: on shutdown, stream closure or retry
    /// exhaustion. Background tasks are stopped on the way out.
    pub async fn run<S: TransportStream>(self, stream: S) -> Result<()> {
        self.alerts.restore().await?;

        let (ingestor, mut tasks) = Ingestor::start(Arc::clone(&self.pipeline), &self.config.ingest);
        let _subscriptions = ingestor.attach(&self.bus).await?;

        tasks.push(self.spawn_status_watch());
        if let Some(memory) = &self.memory {
            tasks.push(spawn_purge(
                Arc::clone(memory),
                Duration::from_secs(self.config.cache.purge_interval_secs.max(1)),
            ));
        }
        if self.config.hub.enabled {
            let listener = TcpListener::bind(self.config.hub.bind.as_str()).await?;
            let server = Arc::new(ObserverServer::new(
                Arc::clone(&self.hub),
                SocketSettings::from(&self.config.hub),
            ));
            tasks.push(tokio::spawn(async move {
                if let Err(err) = server.serve(listener).await {
                    error!(error = %err, "Observer endpoint stopped");
                }
            }));
        }

        info!(shards = ingestor.shard_count(), "Service running");
        let result = self.bus.run(stream).await;

        for task in tasks {
            task.abort();
        }
        info!("Service stopped");
        result
    }

    fn spawn_status_watch(&self) -> JoinHandle<()> {
        let mut state = self.bus.watch_state();
        let hub = Arc::clone(&self.hub);
        let notifiers = Arc::clone(&self.notifiers);

        tokio::spawn(async move {
            while state.changed().await.is_ok() {
                let current = *state.borrow_and_update();
                hub.broadcast_all(ObserverEvent::SystemStatus(SystemStatus {
                    transport: current,
                    detail: None,
                }));
                if current == ConnectionState::Reconnecting {
                    notifiers.notify_all(Event::TransportDegraded {
                        reason: "broker connection lost".to_string(),
                    });
                }
            }
        })
    }
}

fn spawn_purge(store: Arc<MemoryStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, "Expired cache entries purged");
            }
        }
    })
}

/// Connect to the configured broker and run every service.
pub async fn run(config: Config) -> Result<()> {
    let (transport, stream) = mqtt::connect(&config.mqtt);
    let service = Service::build(config, Arc::new(transport)).await?;
    service.run(stream).await
}
