//! HistoryStore interface tests.
//!
//! These tests verify the contract of the HistoryStore trait.
//! Each storage implementation should run these tests against a fresh store.

use product_registry::storage::{HistoryStore, StorageError, StoredHistory};
use product_registry::Snapshot;

/// Create a test snapshot.
pub fn make_snapshot(payload: &str, timestamp: i64) -> Snapshot {
    Snapshot {
        payload: payload.to_string(),
        timestamp,
    }
}

async fn find<S: HistoryStore>(store: &S, id: &str) -> Option<StoredHistory> {
    store
        .load_all()
        .await
        .expect("load_all should succeed")
        .into_iter()
        .find(|h| h.id == id)
}

// =============================================================================
// HistoryStore::append tests
// =============================================================================

pub async fn test_append_first_snapshot<S: HistoryStore>(store: &S) {
    let id = "test_append_first";

    store
        .append(id, 0, &make_snapshot("v0", 100))
        .await
        .expect("append should succeed");

    let history = find(store, id).await.expect("history should exist");
    assert_eq!(history.snapshots, vec![make_snapshot("v0", 100)]);
}

pub async fn test_append_sequential<S: HistoryStore>(store: &S) {
    let id = "test_append_sequential";

    for seq in 0..5u32 {
        store
            .append(id, seq, &make_snapshot(&format!("v{}", seq), 200 + i64::from(seq)))
            .await
            .expect("append should succeed");
    }

    let history = find(store, id).await.expect("history should exist");
    let payloads: Vec<_> = history.snapshots.iter().map(|s| s.payload.as_str()).collect();
    assert_eq!(payloads, vec!["v0", "v1", "v2", "v3", "v4"]);
}

pub async fn test_append_taken_sequence_conflicts<S: HistoryStore>(store: &S) {
    let id = "test_append_taken";

    store
        .append(id, 0, &make_snapshot("original", 300))
        .await
        .expect("append should succeed");

    let result = store.append(id, 0, &make_snapshot("intruder", 301)).await;
    match result {
        Err(StorageError::SequenceConflict { id: conflict_id, sequence }) => {
            assert_eq!(conflict_id, id);
            assert_eq!(sequence, 0);
        }
        other => panic!("expected SequenceConflict, got {:?}", other),
    }

    let history = find(store, id).await.expect("history should exist");
    assert_eq!(history.snapshots, vec![make_snapshot("original", 300)]);
}

pub async fn test_append_same_sequence_different_items<S: HistoryStore>(store: &S) {
    store
        .append("test_append_pair_a", 0, &make_snapshot("a", 400))
        .await
        .expect("append should succeed");
    store
        .append("test_append_pair_b", 0, &make_snapshot("b", 400))
        .await
        .expect("sequence is scoped per item");
}

pub async fn test_append_preserves_payload<S: HistoryStore>(store: &S) {
    let id = "test_append_payload";
    let payload = "{\"name\":\"Sérum\",\"quote\":\"it's\"}\n\t";

    store
        .append(id, 0, &make_snapshot(payload, 500))
        .await
        .expect("append should succeed");

    let history = find(store, id).await.expect("history should exist");
    assert_eq!(history.snapshots[0].payload, payload);
    assert_eq!(history.snapshots[0].timestamp, 500);
}

pub async fn test_append_equal_timestamps<S: HistoryStore>(store: &S) {
    let id = "test_append_equal_ts";

    store
        .append(id, 0, &make_snapshot("v0", 600))
        .await
        .expect("append should succeed");
    store
        .append(id, 1, &make_snapshot("v1", 600))
        .await
        .expect("equal timestamps are allowed");

    let history = find(store, id).await.expect("history should exist");
    assert_eq!(history.snapshots.len(), 2);
    assert_eq!(history.snapshots[1].payload, "v1");
}

// =============================================================================
// HistoryStore::load_all tests
// =============================================================================

pub async fn test_load_all_groups_by_item<S: HistoryStore>(store: &S) {
    // Interleave writes across items
    store.append("test_load_x", 0, &make_snapshot("x0", 700)).await.unwrap();
    store.append("test_load_y", 0, &make_snapshot("y0", 701)).await.unwrap();
    store.append("test_load_x", 1, &make_snapshot("x1", 702)).await.unwrap();
    store.append("test_load_y", 1, &make_snapshot("y1", 703)).await.unwrap();

    let all = store.load_all().await.expect("load_all should succeed");

    let x = all.iter().find(|h| h.id == "test_load_x").expect("x stored");
    let y = all.iter().find(|h| h.id == "test_load_y").expect("y stored");
    assert_eq!(
        x.snapshots,
        vec![make_snapshot("x0", 700), make_snapshot("x1", 702)]
    );
    assert_eq!(
        y.snapshots,
        vec![make_snapshot("y0", 701), make_snapshot("y1", 703)]
    );

    let x_entries = all.iter().filter(|h| h.id == "test_load_x").count();
    assert_eq!(x_entries, 1, "each item appears once");
}

pub async fn test_load_all_unknown_absent<S: HistoryStore>(store: &S) {
    assert!(find(store, "test_load_never_written").await.is_none());
}

#[macro_export]
macro_rules! run_history_store_tests {
    ($store:expr) => {
        use $crate::storage::history_store_tests::*;

        // append tests
        test_append_first_snapshot($store).await;
        println!("  test_append_first_snapshot: PASSED");

        test_append_sequential($store).await;
        println!("  test_append_sequential: PASSED");

        test_append_taken_sequence_conflicts($store).await;
        println!("  test_append_taken_sequence_conflicts: PASSED");

        test_append_same_sequence_different_items($store).await;
        println!("  test_append_same_sequence_different_items: PASSED");

        test_append_preserves_payload($store).await;
        println!("  test_append_preserves_payload: PASSED");

        test_append_equal_timestamps($store).await;
        println!("  test_append_equal_timestamps: PASSED");

        // load_all tests
        test_load_all_groups_by_item($store).await;
        println!("  test_load_all_groups_by_item: PASSED");

        test_load_all_unknown_absent($store).await;
        println!("  test_load_all_unknown_absent: PASSED");
    };
}
