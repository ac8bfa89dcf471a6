//! Integration tests for the pipeline driver against a real SQLite store

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fuel_log_indexer::{
    config::{AppConfig, RetryConfig},
    engine::{
        batch_processor::BatchProcessor,
        filtering::LogDataFilter,
        pipeline::{CycleOutcome, PipelineDriver, PipelineError},
    },
    models::{Block, LogEntry, LogTypeSet},
    persistence::{error::PersistenceError, sqlite::SqliteRecordStore, traits::RecordStore},
    providers::InMemoryBlockSource,
    supervisor::Supervisor,
    test_helpers::{BlockBuilder, ReceiptBuilder},
};
use tokio_util::sync::CancellationToken;

const PIPELINE: &str = "fuel-testnet";
const RB_A: u64 = 6732614218709939873;
const RB_B: u64 = 12195664052085097644;

async fn setup_db() -> Arc<SqliteRecordStore> {
    let store = SqliteRecordStore::new("sqlite::memory:")
        .await
        .expect("Failed to set up in-memory database");
    store.run_migrations().await.expect("Failed to run migrations");
    Arc::new(store)
}

fn config(start_block: u64) -> AppConfig {
    AppConfig {
        pipeline_id: PIPELINE.to_string(),
        start_block,
        polling_interval_ms: Duration::from_millis(1),
        retry: RetryConfig {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            max_consecutive_failures: 0,
        },
        ..Default::default()
    }
}

fn driver<R: RecordStore + 'static>(
    config: AppConfig,
    blocks: Vec<Block>,
    batch_size: usize,
    store: Arc<R>,
) -> PipelineDriver<InMemoryBlockSource, R, LogDataFilter> {
    PipelineDriver::new(
        Arc::new(config),
        Arc::new(InMemoryBlockSource::new(blocks, batch_size)),
        store,
        BatchProcessor::new(LogDataFilter::new(LogTypeSet::default())),
        CancellationToken::new(),
    )
}

/// Blocks `0..count`, where every third block carries one log of each known
/// type plus noise the filter must drop.
fn chain(count: u64) -> Vec<Block> {
    (0..count)
        .map(|height| {
            let mut block = BlockBuilder::new(height);
            if height % 3 == 0 {
                block = block
                    .receipt(ReceiptBuilder::log_data(RB_A).data(vec![height as u8]).build())
                    .receipt(ReceiptBuilder::call().build())
                    .receipt(ReceiptBuilder::log_data(RB_B).data(vec![height as u8, 1]).build());
            }
            block.build()
        })
        .collect()
}

async fn drain<R: RecordStore + 'static>(
    driver: &PipelineDriver<InMemoryBlockSource, R, LogDataFilter>,
) -> usize {
    let mut cycles = 0;
    while let CycleOutcome::Committed { .. } = driver.run_cycle().await.unwrap() {
        cycles += 1;
    }
    cycles
}

fn content(entries: &[LogEntry]) -> Vec<(u64, u64, Vec<u8>)> {
    entries.iter().map(|e| (e.found_at, e.rb, e.data.to_vec())).collect()
}

#[tokio::test]
async fn test_block_with_mixed_receipts_yields_one_record() {
    let store = setup_db().await;
    let contract = [0xC0; 32];
    let tx_hash = [0x7A; 32];
    let block = BlockBuilder::new(100)
        .receipt(
            ReceiptBuilder::log_data(RB_A)
                .contract(contract)
                .data(vec![0xD0, 0x0D])
                .transaction_hash(tx_hash)
                .build(),
        )
        .receipt(ReceiptBuilder::log_data(9999999999999999999).build())
        .receipt(ReceiptBuilder::call().build())
        .receipt(ReceiptBuilder::log_data(RB_B).no_data().build())
        .build();

    let driver = driver(config(100), vec![block], 10, Arc::clone(&store));
    let outcome = driver.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Committed { progress_marker: 100, entries: 1 });
    assert_eq!(store.read_progress_marker(PIPELINE).await.unwrap(), Some(100));

    let stored = store.get_log_entries(100, 100).await.unwrap();
    assert_eq!(stored.len(), 1);
    let entry = &stored[0];
    assert_eq!(entry.found_at, 100);
    assert_eq!(entry.rb, RB_A);
    assert_eq!(entry.contract.as_slice(), &contract);
    assert_eq!(entry.data.as_slice(), &[0xD0, 0x0D]);
    assert_eq!(entry.tx_hash.as_slice(), &tx_hash);
    assert_eq!(entry.id.len(), 32);
}

#[tokio::test]
async fn test_blocks_without_matches_advance_the_marker() {
    let store = setup_db().await;
    let blocks = (50..60)
        .map(|h| BlockBuilder::new(h).receipt(ReceiptBuilder::call().build()).build())
        .collect();

    let driver = driver(config(50), blocks, 100, Arc::clone(&store));
    let outcome = driver.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::Committed { progress_marker: 59, entries: 0 });
    assert_eq!(store.read_progress_marker(PIPELINE).await.unwrap(), Some(59));
    assert_eq!(store.count_log_entries().await.unwrap(), 0);
    assert_eq!(driver.run_cycle().await.unwrap(), CycleOutcome::Empty);
}

#[tokio::test]
async fn test_resume_after_restart_matches_uninterrupted_run() {
    let uninterrupted = setup_db().await;
    drain(&driver(config(0), chain(30), 4, Arc::clone(&uninterrupted))).await;

    let resumed = setup_db().await;
    let first = driver(config(0), chain(30), 4, Arc::clone(&resumed));
    first.run_cycle().await.unwrap();
    first.run_cycle().await.unwrap();
    drop(first);
    assert_eq!(resumed.read_progress_marker(PIPELINE).await.unwrap(), Some(7));

    // A fresh driver picks up after the stored marker.
    drain(&driver(config(0), chain(30), 4, Arc::clone(&resumed))).await;

    let expected = uninterrupted.get_log_entries(0, u64::MAX).await.unwrap();
    let actual = resumed.get_log_entries(0, u64::MAX).await.unwrap();
    assert_eq!(expected.len(), 20);
    assert_eq!(content(&actual), content(&expected));
    assert_eq!(resumed.read_progress_marker(PIPELINE).await.unwrap(), Some(29));
}

#[tokio::test]
async fn test_rerun_over_a_completed_range_writes_nothing() {
    let store = setup_db().await;
    drain(&driver(config(0), chain(12), 5, Arc::clone(&store))).await;
    let count = store.count_log_entries().await.unwrap();

    let cycles = drain(&driver(config(0), chain(12), 5, Arc::clone(&store))).await;

    assert_eq!(cycles, 0);
    assert_eq!(store.count_log_entries().await.unwrap(), count);
}

/// Wraps a store and fails the first `failures` commits before touching the
/// database.
struct FlakyStore {
    inner: Arc<SqliteRecordStore>,
    failures: AtomicUsize,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn read_progress_marker(&self, pipeline_id: &str) -> Result<Option<u64>, PersistenceError> {
        self.inner.read_progress_marker(pipeline_id).await
    }

    async fn commit(
        &self,
        pipeline_id: &str,
        entries: Vec<LogEntry>,
        progress_marker: u64,
    ) -> Result<(), PersistenceError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PersistenceError::StoreUnavailable("database is locked".into()));
        }
        self.inner.commit(pipeline_id, entries, progress_marker).await
    }

    async fn count_log_entries(&self) -> Result<u64, PersistenceError> {
        self.inner.count_log_entries().await
    }

    async fn get_log_entries(&self, from: u64, to: u64) -> Result<Vec<LogEntry>, PersistenceError> {
        self.inner.get_log_entries(from, to).await
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        self.inner.flush().await
    }

    async fn cleanup(&self) -> Result<(), PersistenceError> {
        self.inner.cleanup().await
    }
}

#[tokio::test]
async fn test_failed_commit_is_retried_from_the_same_marker() {
    let inner = setup_db().await;
    let flaky = Arc::new(FlakyStore { inner: Arc::clone(&inner), failures: AtomicUsize::new(1) });
    let driver = driver(config(0), chain(6), 3, flaky);

    let error = driver.run_cycle().await.unwrap_err();
    assert!(matches!(error, PipelineError::Store(PersistenceError::StoreUnavailable(_))));
    assert_eq!(inner.read_progress_marker(PIPELINE).await.unwrap(), None);
    assert_eq!(inner.count_log_entries().await.unwrap(), 0);

    assert_eq!(
        driver.run_cycle().await.unwrap(),
        CycleOutcome::Committed { progress_marker: 2, entries: 2 }
    );
    assert_eq!(inner.count_log_entries().await.unwrap(), 2);
}

#[tokio::test]
async fn test_supervisor_runs_the_chain_and_shuts_down_cleanly() {
    let store = setup_db().await;
    let source = InMemoryBlockSource::new(chain(25), 7);
    let config = AppConfig { batch_size: 7, ..config(0) };

    let supervisor = Supervisor::builder()
        .config(config)
        .store(store.clone())
        .source(Arc::new(source))
        .build()
        .unwrap();
    let token = supervisor.cancellation_token();
    let handle = tokio::spawn(supervisor.run());

    let caught_up = async {
        while store.read_progress_marker(PIPELINE).await.unwrap() != Some(24) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), caught_up)
        .await
        .expect("pipeline did not reach the end of the chain");
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    // Heights 0, 3, ..., 24 carry two records each.
    assert_eq!(store.count_log_entries().await.unwrap(), 18);
}
