//! `edifice check`: validate configuration without connecting anywhere.

use std::path::Path;

use anyhow::{Context, Result};

use super::output;
use crate::infrastructure::config::cache::CacheBackend;
use crate::infrastructure::config::settings::Config;

pub fn execute(config_path: &Path) -> Result<()> {
    println!("Checking configuration: {}", config_path.display());

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            output::error("Configuration is invalid");
            return Err(err).with_context(|| format!("could not load {}", config_path.display()));
        }
    };
    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("Broker", format!("{}:{}", config.mqtt.host, config.mqtt.port));
    output::key_value("Client id", &config.mqtt.client_id);
    output::key_value("QoS", config.mqtt.qos);
    output::key_value("Max retries", config.reconnection.max_retries);
    output::key_value(
        "Cache",
        match config.cache.backend {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        },
    );
    output::key_value("Ingest shards", config.ingest.shards);
    output::key_value("Directory", format!("{} sources", config.directory.len()));
    if config.hub.enabled {
        output::key_value("Observers", &config.hub.bind);
    } else {
        output::key_value("Observers", "disabled");
    }
    output::key_value("Auto-resolve", config.alerts.auto_resolve);

    println!();
    if config.mqtt.username.is_some() {
        output::ok("Broker credentials found (MQTT_USERNAME)");
    } else {
        output::warn("No broker credentials; connecting anonymously");
    }
    if config.notifications.webhook.url.is_some() {
        output::ok("Webhook configured (EDIFICE_WEBHOOK_URL)");
    }
    if config.directory.is_empty() {
        output::warn("Directory is empty; alerts will be broadcast to every observer");
    }

    println!();
    println!("Configuration is ready to use.");
    Ok(())
}
