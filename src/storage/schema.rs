//! Database schema definitions using sea-query.

use sea_query::Iden;

/// Snapshots table schema.
#[derive(Iden)]
pub enum Snapshots {
    Table,
    #[iden = "item_id"]
    ItemId,
    #[iden = "sequence"]
    Sequence,
    #[iden = "payload"]
    Payload,
    #[iden = "recorded_at"]
    RecordedAt,
}

/// SQL for creating the snapshots table.
pub const CREATE_SNAPSHOTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    item_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    payload TEXT NOT NULL,
    recorded_at INTEGER NOT NULL,
    PRIMARY KEY (item_id, sequence)
);
"#;
