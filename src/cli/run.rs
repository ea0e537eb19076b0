//! `edifice run`: the long-running service.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

pub async fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    config.init_logging();
    info!(config = %config_path.display(), "edifice starting");

    tokio::select! {
        result = bootstrap::run(config) => result.context("service stopped with an error")?,
        _ = signal::ctrl_c() => info!("Shutdown signal received"),
    }

    info!("edifice stopped");
    Ok(())
}
