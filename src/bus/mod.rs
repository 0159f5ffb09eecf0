//! Notification bus for registry change signals.
//!
//! This module contains:
//! - `Notification`: what changed (identifier only, never the payload)
//! - `Observer` trait: in-process consumers invoked on every publish
//! - `NotificationBus` trait: delivery to observers and live subscribers
//! - Implementations: Channel (tokio broadcast), Mock
//!
//! Delivery is best-effort. The registry publishes after a mutation has been
//! committed and ignores any error returned here.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub mod channel;
pub mod dispatch;
pub mod mock;

pub use channel::ChannelNotificationBus;
pub use dispatch::dispatch_to_observers;
pub use mock::MockNotificationBus;

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Observer '{name}' failed: {message}")]
    ObserverFailed { name: String, message: String },

    #[error("Subscribe not supported for this bus type")]
    SubscribeNotSupported,
}

/// Change signal emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification {
    /// A new item history was started.
    Created { id: String },
    /// A snapshot was appended to an existing history.
    Appended { id: String },
}

impl Notification {
    pub fn id(&self) -> &str {
        match self {
            Notification::Created { id } | Notification::Appended { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Created { .. } => "created",
            Notification::Appended { .. } => "appended",
        }
    }
}

/// In-process consumer of notifications.
pub trait Observer: Send + Sync {
    /// Process one notification.
    fn handle(&self, notification: Arc<Notification>) -> BoxFuture<'static, Result<()>>;
}

/// Interface for notification delivery.
///
/// Implementations:
/// - `ChannelNotificationBus`: observers plus tokio broadcast subscribers
/// - `MockNotificationBus`: records publishes for assertions
#[async_trait]
pub trait NotificationBus: Send + Sync {
    /// Deliver a notification to every observer and live subscriber.
    ///
    /// The notification is wrapped in Arc so all consumers share one
    /// immutable value.
    async fn publish(&self, notification: Arc<Notification>) -> Result<()>;

    /// Register an observer for all later publishes.
    async fn subscribe(&self, observer: Box<dyn Observer>) -> Result<()>;

    /// Open a live receiver for all later publishes.
    fn stream(&self) -> Result<broadcast::Receiver<Arc<Notification>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_accessors() {
        let created = Notification::Created {
            id: "12345".to_string(),
        };
        assert_eq!(created.id(), "12345");
        assert_eq!(created.kind(), "created");

        let appended = Notification::Appended {
            id: "12345".to_string(),
        };
        assert_eq!(appended.kind(), "appended");
    }

    #[test]
    fn test_notification_json_shape() {
        let n = Notification::Appended {
            id: "12345".to_string(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "appended", "id": "12345"}));

        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back, n);
    }
}
