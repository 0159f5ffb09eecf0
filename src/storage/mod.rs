//! Durable history storage.
//!
//! The registry keeps its working state in memory and writes every accepted
//! snapshot through a [`HistoryStore`] before committing it. On startup the
//! store is replayed to rebuild that state.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::registry::Snapshot;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryHistoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteHistoryStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Sequence conflict: item={id}, sequence={sequence}")]
    SequenceConflict { id: String, sequence: u32 },

    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Storage backend not available: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One item's stored history, ordered by sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHistory {
    pub id: String,
    pub snapshots: Vec<Snapshot>,
}

/// Interface for snapshot persistence.
///
/// The `(id, sequence)` pair is the unique key of a stored snapshot.
/// Sequence 0 is always the snapshot recorded by the creating call.
///
/// Implementations:
/// - `MemoryHistoryStore`: in-process, lost on exit
/// - `SqliteHistoryStore`: SQLite file or in-memory database
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Durably record snapshot `sequence` of `id`.
    ///
    /// Fails with `SequenceConflict` if that position is already taken.
    async fn append(&self, id: &str, sequence: u32, snapshot: &Snapshot) -> Result<()>;

    /// Load every stored history, each ordered by ascending sequence.
    async fn load_all(&self) -> Result<Vec<StoredHistory>>;
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn HistoryStore>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: memory (history is lost on exit)");
            Ok(Arc::new(MemoryHistoryStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let path = &config.sqlite.path;
            info!("Storage: sqlite at {}", path);

            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
            let store = SqliteHistoryStore::new(pool);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unavailable("sqlite feature not enabled".to_string()))
        }
    }
}
