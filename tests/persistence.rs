//! Integration tests for the persistence layer

use fuel_log_indexer::{
    engine::record_mapper::generate_id,
    models::{HexBytes, LogEntry},
    persistence::{error::PersistenceError, sqlite::SqliteRecordStore, traits::RecordStore},
};

async fn setup_db(database_url: &str) -> SqliteRecordStore {
    let store =
        SqliteRecordStore::new(database_url).await.expect("Failed to set up database");
    store.run_migrations().await.expect("Failed to run migrations");
    store
}

fn create_test_entry(found_at: u64, rb: u64) -> LogEntry {
    LogEntry {
        id: generate_id(),
        tx_hash: HexBytes::from([0x42; 32]),
        found_at,
        contract: HexBytes::from([0x0C; 32]),
        rb,
        data: HexBytes::from(vec![found_at as u8; 8]),
    }
}

#[tokio::test]
async fn test_progress_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite:{}", dir.path().join("indexer.db").display());

    let entries: Vec<_> = (0..5).map(|h| create_test_entry(h, 6732614218709939873)).collect();
    {
        let store = setup_db(&database_url).await;
        store.commit("mainnet", entries.clone(), 4).await.unwrap();
        store.flush().await.unwrap();
        store.close().await;
    }

    // Migrations are idempotent on an existing database.
    let reopened = setup_db(&database_url).await;
    assert_eq!(reopened.read_progress_marker("mainnet").await.unwrap(), Some(4));
    assert_eq!(reopened.get_log_entries(0, 10).await.unwrap(), entries);
}

#[tokio::test]
async fn test_conflicting_batch_is_rolled_back_entirely() {
    let store = setup_db("sqlite::memory:").await;
    let existing = create_test_entry(10, 1);
    store.commit("mainnet", vec![existing.clone()], 10).await.unwrap();

    let mut batch: Vec<_> = (11..15).map(|h| create_test_entry(h, 2)).collect();
    let mut clash = create_test_entry(15, 2);
    clash.id = existing.id.clone();
    batch.push(clash);

    let result = store.commit("mainnet", batch, 15).await;

    assert!(matches!(result, Err(PersistenceError::StoreConflict(_))));
    assert_eq!(store.read_progress_marker("mainnet").await.unwrap(), Some(10));
    assert_eq!(store.get_log_entries(0, 100).await.unwrap(), vec![existing]);
}

#[tokio::test]
async fn test_marker_moves_only_with_commits() {
    let store = setup_db("sqlite::memory:").await;
    assert_eq!(store.read_progress_marker("mainnet").await.unwrap(), None);

    for (marker, batch) in [(3, 0..=3), (7, 4..=7)] {
        let entries = batch.map(|h| create_test_entry(h, 12195664052085097644)).collect();
        store.commit("mainnet", entries, marker).await.unwrap();
        assert_eq!(store.read_progress_marker("mainnet").await.unwrap(), Some(marker));
    }

    assert_eq!(store.count_log_entries().await.unwrap(), 8);
    assert_eq!(store.read_progress_marker("testnet").await.unwrap(), None);
}
