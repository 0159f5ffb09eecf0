//! Product history registry.
//!
//! Owns the mapping from item identifier to its append-only history of
//! snapshots. Every mutation runs under a single writer lock that covers
//! timestamp assignment, the durable write, the in-memory commit and the
//! notification, so mutations are totally ordered. Readers only take the
//! state lock, which is held for the in-memory commit alone.
//!
//! ```text
//!   create/append ──► writer lock ──► store.append ──► state commit ──► bus.publish
//!   current/history/count ─────────────────────────► state (read)
//! ```
//!
//! Mutations run on their own task, so dropping the caller's future cannot
//! leave a durable write without its in-memory commit.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn, Instrument};

use crate::bus::{Notification, NotificationBus};
use crate::clock::{Clock, Timestamp};
use crate::storage::{HistoryStore, StorageError, StoredHistory};

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors returned by registry operations.
///
/// None of these leave partial state behind: a failed call has no effect.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Item already exists: {0}")]
    AlreadyExists(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Mutation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One accepted version of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Caller-supplied content, stored verbatim.
    pub payload: String,
    /// Acceptance time assigned by the registry.
    pub timestamp: Timestamp,
}

/// Latest payload of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub id: String,
    pub payload: String,
}

/// Guarded by the writer lock; only mutations touch it.
struct Ledger {
    /// Greatest timestamp handed out so far. Readings below it are clamped.
    last_timestamp: Timestamp,
}

/// Append-only registry of item histories.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    histories: RwLock<HashMap<String, Vec<Snapshot>>>,
    writer: Mutex<Ledger>,
    store: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
    bus: Arc<dyn NotificationBus>,
}

impl Registry {
    /// Open a registry over `store`, replaying every stored history.
    ///
    /// The clamp floor starts at the newest stored timestamp so that
    /// timestamps keep increasing across restarts even if the clock does not.
    pub async fn open(
        store: Arc<dyn HistoryStore>,
        clock: Arc<dyn Clock>,
        bus: Arc<dyn NotificationBus>,
    ) -> Result<Self> {
        let stored = store.load_all().await?;

        let mut histories = HashMap::with_capacity(stored.len());
        let mut last_timestamp = Timestamp::MIN;
        for StoredHistory { id, snapshots } in stored {
            let Some(newest) = snapshots.iter().map(|s| s.timestamp).max() else {
                continue;
            };
            last_timestamp = last_timestamp.max(newest);
            histories.insert(id, snapshots);
        }

        info!(items = histories.len(), "Registry opened");

        Ok(Self {
            inner: Arc::new(RegistryInner {
                histories: RwLock::new(histories),
                writer: Mutex::new(Ledger { last_timestamp }),
                store,
                clock,
                bus,
            }),
        })
    }

    /// The bus this registry publishes to.
    pub fn bus(&self) -> &Arc<dyn NotificationBus> {
        &self.inner.bus
    }

    /// Start a new history for `id` with `payload` as its first snapshot.
    ///
    /// Once started, the mutation runs to completion on its own task even if
    /// the returned future is dropped.
    #[tracing::instrument(name = "registry.create", skip(self, id, payload), fields(id = %id))]
    pub async fn create(&self, id: &str, payload: impl Into<String>) -> Result<Snapshot> {
        if id.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "identifier must not be empty".to_string(),
            ));
        }

        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        let payload = payload.into();
        tokio::spawn(async move { inner.create(id, payload).await }.in_current_span()).await?
    }

    /// Append `payload` as the newest snapshot of an existing history.
    ///
    /// Runs detached like [`Registry::create`].
    #[tracing::instrument(name = "registry.append", skip(self, id, payload), fields(id = %id))]
    pub async fn append(&self, id: &str, payload: impl Into<String>) -> Result<Snapshot> {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        let payload = payload.into();
        tokio::spawn(async move { inner.append(id, payload).await }.in_current_span()).await?
    }

    /// Latest payload of `id`, always the last element of its history.
    pub async fn current(&self, id: &str) -> Result<ItemState> {
        let histories = self.inner.histories.read().await;
        histories
            .get(id)
            .and_then(|history| history.last())
            .map(|last| ItemState {
                id: id.to_string(),
                payload: last.payload.clone(),
            })
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Full history of `id` in acceptance order.
    ///
    /// The returned vector is a copy; later appends do not affect it.
    pub async fn history(&self, id: &str) -> Result<Vec<Snapshot>> {
        let histories = self.inner.histories.read().await;
        histories
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Number of known identifiers.
    pub async fn count(&self) -> usize {
        self.inner.histories.read().await.len()
    }
}

impl RegistryInner {
    async fn create(&self, id: String, payload: String) -> Result<Snapshot> {
        let mut ledger = self.writer.lock().await;

        if self.histories.read().await.contains_key(&id) {
            return Err(RegistryError::AlreadyExists(id));
        }

        let snapshot = Snapshot {
            payload,
            timestamp: self.next_timestamp(&ledger),
        };
        self.store.append(&id, 0, &snapshot).await?;

        ledger.last_timestamp = snapshot.timestamp;
        self.histories
            .write()
            .await
            .insert(id.clone(), vec![snapshot.clone()]);

        info!(timestamp = snapshot.timestamp, "Item created");

        self.notify(Notification::Created { id }).await;

        Ok(snapshot)
    }

    async fn append(&self, id: String, payload: String) -> Result<Snapshot> {
        let mut ledger = self.writer.lock().await;

        let sequence = {
            let histories = self.histories.read().await;
            let history = histories
                .get(&id)
                .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
            u32::try_from(history.len()).map_err(|_| {
                RegistryError::InvalidArgument(format!("history for '{}' is full", id))
            })?
        };

        let snapshot = Snapshot {
            payload,
            timestamp: self.next_timestamp(&ledger),
        };
        self.store.append(&id, sequence, &snapshot).await?;

        ledger.last_timestamp = snapshot.timestamp;
        if let Some(history) = self.histories.write().await.get_mut(&id) {
            history.push(snapshot.clone());
        }

        info!(sequence = sequence, timestamp = snapshot.timestamp, "Snapshot appended");

        self.notify(Notification::Appended { id }).await;

        Ok(snapshot)
    }

    /// Read the clock, clamped so it never goes below the last handed-out value.
    fn next_timestamp(&self, ledger: &Ledger) -> Timestamp {
        let reading = self.clock.now();
        if reading < ledger.last_timestamp {
            debug!(
                reading = reading,
                floor = ledger.last_timestamp,
                "Clock behind last timestamp, clamping"
            );
            return ledger.last_timestamp;
        }
        reading
    }

    /// Best-effort delivery; the mutation is already committed.
    async fn notify(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.bus.publish(Arc::new(notification)).await {
            warn!(kind = kind, error = %e, "Notification delivery failed");
        }
    }
}
