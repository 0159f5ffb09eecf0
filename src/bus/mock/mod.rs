//! Mock notification bus implementation for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use super::{BusError, Notification, NotificationBus, Observer, Result};

/// Mock notification bus that records every publish.
#[derive(Default)]
pub struct MockNotificationBus {
    published: RwLock<Vec<Notification>>,
    fail_on_publish: RwLock<bool>,
}

impl MockNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_publish(&self, fail: bool) {
        *self.fail_on_publish.write().await = fail;
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn take_published(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.published.write().await)
    }
}

#[async_trait]
impl NotificationBus for MockNotificationBus {
    async fn publish(&self, notification: Arc<Notification>) -> Result<()> {
        if *self.fail_on_publish.read().await {
            return Err(BusError::Publish("Mock publish failure".to_string()));
        }
        self.published.write().await.push((*notification).clone());
        Ok(())
    }

    async fn subscribe(&self, _observer: Box<dyn Observer>) -> Result<()> {
        Err(BusError::SubscribeNotSupported)
    }

    fn stream(&self) -> Result<broadcast::Receiver<Arc<Notification>>> {
        Err(BusError::SubscribeNotSupported)
    }
}
