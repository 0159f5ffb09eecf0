//! In-memory channel-based notification bus.
//!
//! Observers registered with `subscribe` are awaited in order on every
//! publish. Live subscribers (for example the HTTP notification stream)
//! receive notifications through a tokio broadcast channel and may lag.
//! An observer failure is reported by `publish` only after every observer
//! and live subscriber has been served.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use super::{dispatch_to_observers, BusError, Notification, NotificationBus, Observer, Result};

/// Default channel capacity for broadcast.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Notification bus using a tokio broadcast channel.
pub struct ChannelNotificationBus {
    /// Broadcast sender for live subscribers.
    sender: broadcast::Sender<Arc<Notification>>,
    /// Registered observers.
    observers: RwLock<Vec<Box<dyn Observer>>>,
}

impl ChannelNotificationBus {
    /// Create a bus whose live subscribers buffer up to `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        info!(capacity = capacity, "Channel notification bus initialized");

        Self {
            sender,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

impl Default for ChannelNotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl NotificationBus for ChannelNotificationBus {
    #[tracing::instrument(name = "bus.publish", skip_all, fields(id = %notification.id(), kind = notification.kind()))]
    async fn publish(&self, notification: Arc<Notification>) -> Result<()> {
        let observers_ok = dispatch_to_observers(&self.observers, &notification).await;

        // Send to channel (ignore error if no receivers)
        match self.sender.send(notification) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Published notification to channel");
            }
            Err(_) => {
                debug!("Published notification (no receivers)");
            }
        }

        if !observers_ok {
            return Err(BusError::Publish(
                "one or more observers failed".to_string(),
            ));
        }
        Ok(())
    }

    async fn subscribe(&self, observer: Box<dyn Observer>) -> Result<()> {
        let count = {
            let mut observers = self.observers.write().await;
            observers.push(observer);
            observers.len()
        };

        info!(observer_count = count, "Observer subscribed to channel bus");

        Ok(())
    }

    fn stream(&self) -> Result<broadcast::Receiver<Arc<Notification>>> {
        Ok(self.sender.subscribe())
    }
}
