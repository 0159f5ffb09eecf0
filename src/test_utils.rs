//! Test utilities: observer doubles for bus and registry tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::bus::{BusError, Notification, Observer, Result as BusResult};

/// Observer that counts deliveries.
#[derive(Default)]
pub struct CountingObserver {
    count: Arc<AtomicUsize>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counter, readable after the observer has been boxed away.
    pub fn count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }
}

impl Observer for CountingObserver {
    fn handle(&self, _notification: Arc<Notification>) -> BoxFuture<'static, BusResult<()>> {
        let count = Arc::clone(&self.count);
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Observer that records every notification it sees, in order.
#[derive(Default)]
pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<Notification>>> {
        Arc::clone(&self.seen)
    }
}

impl Observer for RecordingObserver {
    fn handle(&self, notification: Arc<Notification>) -> BoxFuture<'static, BusResult<()>> {
        let seen = Arc::clone(&self.seen);
        Box::pin(async move {
            seen.lock().await.push((*notification).clone());
            Ok(())
        })
    }
}

/// Observer that always fails.
pub struct FailingObserver;

impl Observer for FailingObserver {
    fn handle(&self, _notification: Arc<Notification>) -> BoxFuture<'static, BusResult<()>> {
        Box::pin(async {
            Err::<(), _>(BusError::ObserverFailed {
                name: "failing".to_string(),
                message: "refused".to_string(),
            })
        })
    }
}

/// Observer whose delivery future panics.
pub struct PanickingObserver;

impl Observer for PanickingObserver {
    fn handle(&self, _notification: Arc<Notification>) -> BoxFuture<'static, BusResult<()>> {
        Box::pin(futures::future::lazy(|_| -> BusResult<()> {
            panic!("observer panicked")
        }))
    }
}
