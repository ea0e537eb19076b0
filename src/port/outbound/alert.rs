//! Alert persistence.

use async_trait::async_trait;

use crate::domain::alert::{Alert, AlertId};
use crate::error::Result;

/// Durable alert store. Alerts are never deleted.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: &Alert) -> Result<()>;

    async fn update(&self, alert: &Alert) -> Result<()>;

    async fn get(&self, id: AlertId) -> Result<Option<Alert>>;

    /// Every active or acknowledged alert.
    async fn list_open(&self) -> Result<Vec<Alert>>;
}
