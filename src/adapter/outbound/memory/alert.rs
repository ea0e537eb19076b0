//! In-process alert repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::alert::{Alert, AlertId};
use crate::error::{Error, Result};
use crate::port::outbound::alert::AlertRepository;

#[derive(Default)]
pub struct MemoryAlertRepository {
    alerts: RwLock<HashMap<AlertId, Alert>>,
}

impl MemoryAlertRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts ever stored, resolved included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn insert(&self, alert: &Alert) -> Result<()> {
        let mut alerts = self.alerts.write();
        if alerts.contains_key(&alert.id) {
            return Err(Error::Repository(format!("alert {} already exists", alert.id)));
        }
        alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn update(&self, alert: &Alert) -> Result<()> {
        match self.alerts.write().get_mut(&alert.id) {
            Some(stored) => {
                *stored = alert.clone();
                Ok(())
            }
            None => Err(Error::Repository(format!("alert {} does not exist", alert.id))),
        }
    }

    async fn get(&self, id: AlertId) -> Result<Option<Alert>> {
        Ok(self.alerts.read().get(&id).cloned())
    }

    async fn list_open(&self) -> Result<Vec<Alert>> {
        let mut open: Vec<Alert> = self
            .alerts
            .read()
            .values()
            .filter(|alert| alert.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|alert| alert.created_at);
        Ok(open)
    }
}
