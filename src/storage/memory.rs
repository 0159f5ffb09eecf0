//! In-memory HistoryStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{HistoryStore, Result, StorageError, StoredHistory};
use crate::registry::Snapshot;

/// History store that keeps snapshots in process memory.
///
/// Used for `storage.type: memory` and as the default store in tests.
#[derive(Default)]
pub struct MemoryHistoryStore {
    histories: RwLock<HashMap<String, Vec<Snapshot>>>,
    fail_on_append: RwLock<bool>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail until reset.
    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    /// Number of snapshots stored across all items.
    pub async fn stored_count(&self) -> usize {
        self.histories.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, id: &str, sequence: u32, snapshot: &Snapshot) -> Result<()> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Injected(format!(
                "append refused for item={}",
                id
            )));
        }

        let mut histories = self.histories.write().await;
        let history = histories.entry(id.to_string()).or_default();
        if sequence as usize != history.len() {
            return Err(StorageError::SequenceConflict {
                id: id.to_string(),
                sequence,
            });
        }
        history.push(snapshot.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<StoredHistory>> {
        let histories = self.histories.read().await;
        let mut stored: Vec<StoredHistory> = histories
            .iter()
            .filter(|(_, snapshots)| !snapshots.is_empty())
            .map(|(id, snapshots)| StoredHistory {
                id: id.clone(),
                snapshots: snapshots.clone(),
            })
            .collect();
        stored.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stored)
    }
}
