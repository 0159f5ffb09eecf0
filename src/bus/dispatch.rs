//! Observer dispatch shared by bus implementations.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::error;

use super::{Notification, Observer};

/// Dispatch a notification to all observers, in registration order.
///
/// A failing or panicking observer is logged and skipped; the remaining
/// observers still run. Returns true only if every observer succeeded.
pub async fn dispatch_to_observers(
    observers: &RwLock<Vec<Box<dyn Observer>>>,
    notification: &Arc<Notification>,
) -> bool {
    let observers_guard = observers.read().await;
    let mut all_succeeded = true;

    for observer in observers_guard.iter() {
        let delivery = AssertUnwindSafe(observer.handle(Arc::clone(notification)));
        match delivery.catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(id = %notification.id(), kind = notification.kind(), error = %e, "Observer failed");
                all_succeeded = false;
            }
            Err(_) => {
                error!(id = %notification.id(), kind = notification.kind(), "Observer panicked");
                all_succeeded = false;
            }
        }
    }

    all_succeeded
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_utils::{CountingObserver, FailingObserver, PanickingObserver};

    fn created(id: &str) -> Arc<Notification> {
        Arc::new(Notification::Created { id: id.to_string() })
    }

    #[tokio::test]
    async fn test_dispatch_no_observers() {
        let observers: RwLock<Vec<Box<dyn Observer>>> = RwLock::new(Vec::new());
        assert!(dispatch_to_observers(&observers, &created("a")).await);
    }

    #[tokio::test]
    async fn test_dispatch_failure_does_not_stop_others() {
        let counter = CountingObserver::new();
        let count = counter.count();
        let observers: RwLock<Vec<Box<dyn Observer>>> = RwLock::new(vec![
            Box::new(FailingObserver),
            Box::new(PanickingObserver),
            Box::new(counter),
        ]);

        let ok = dispatch_to_observers(&observers, &created("a")).await;

        assert!(!ok);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
