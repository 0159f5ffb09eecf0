//! SQLite HistoryStore implementation.

use async_trait::async_trait;
use sea_query::{Order, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::{Row, SqlitePool};

use super::schema::{Snapshots, CREATE_SNAPSHOTS_TABLE};
use super::{HistoryStore, Result, StorageError, StoredHistory};
use crate::registry::Snapshot;

/// SQLite implementation of HistoryStore.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new SQLite history store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_SNAPSHOTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, id: &str, sequence: u32, snapshot: &Snapshot) -> Result<()> {
        let (sql, values) = Query::insert()
            .into_table(Snapshots::Table)
            .columns([
                Snapshots::ItemId,
                Snapshots::Sequence,
                Snapshots::Payload,
                Snapshots::RecordedAt,
            ])
            .values_panic([
                id.into(),
                i64::from(sequence).into(),
                snapshot.payload.clone().into(),
                snapshot.timestamp.into(),
            ])
            .build_sqlx(SqliteQueryBuilder);

        match sqlx::query_with(&sql, values).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StorageError::SequenceConflict {
                    id: id.to_string(),
                    sequence,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load_all(&self) -> Result<Vec<StoredHistory>> {
        let (sql, values) = Query::select()
            .columns([
                Snapshots::ItemId,
                Snapshots::Payload,
                Snapshots::RecordedAt,
            ])
            .from(Snapshots::Table)
            .order_by(Snapshots::ItemId, Order::Asc)
            .order_by(Snapshots::Sequence, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;

        let mut stored: Vec<StoredHistory> = Vec::new();
        for row in rows {
            let id: String = row.get("item_id");
            let snapshot = Snapshot {
                payload: row.get("payload"),
                timestamp: row.get("recorded_at"),
            };

            // Rows arrive grouped by item, so only the tail can match.
            match stored.last_mut() {
                Some(history) if history.id == id => history.snapshots.push(snapshot),
                _ => stored.push(StoredHistory {
                    id,
                    snapshots: vec![snapshot],
                }),
            }
        }

        Ok(stored)
    }
}
