//! Batch loading: the second pass over a source file
//!
//! Rows are resolved by a caller-supplied closure, buffered into batches and
//! handed to a single writer task through a bounded channel. The reader waits
//! whenever `max_pending_batches` batches are already queued, and batches
//! commit in the order they were submitted. Each batch gets its own
//! transaction.

use crate::config::{BatchFailurePolicy, ImportConfig};
use crate::ledger::{SkipLedger, BATCH_FAILED};
use crate::progress::RowProgress;
use crate::source::{CsvSource, RawRecord};
use crate::store::{DependentRow, ImportStore};
use futures::StreamExt;
use hotel_common::{ImportError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Writer-side totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub rows_inserted: u64,
    /// Rows belonging to failed batches
    pub rows_failed: u64,
}

/// Totals for one loading pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    pub rows_processed: u64,
    pub rows_queued: u64,
    pub writer: WriterStats,
}

struct Batch<T> {
    seq: u64,
    rows: Vec<T>,
}

/// Persist one batch in its own transaction.
///
/// On failure the transaction is rolled back and the insert error returned.
pub async fn submit_batch<S, T>(store: &S, rows: &[T]) -> Result<u64>
where
    S: ImportStore,
    T: DependentRow,
{
    let mut tx = store.begin().await?;
    match T::insert_batch(store, &mut tx, rows).await {
        Ok(written) => {
            store.commit(tx).await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rollback) = store.rollback(tx).await {
                warn!(error = %rollback, table = T::TABLE, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn run_writer<S, T>(
    store: Arc<S>,
    mut batches: mpsc::Receiver<Batch<T>>,
    policy: BatchFailurePolicy,
) -> Result<WriterStats>
where
    S: ImportStore,
    T: DependentRow,
{
    let mut stats = WriterStats::default();

    while let Some(batch) = batches.recv().await {
        let rows = batch.rows.len();
        match submit_batch(store.as_ref(), &batch.rows).await {
            Ok(written) => {
                stats.batches_committed += 1;
                stats.rows_inserted += written;
                debug!(
                    table = T::TABLE,
                    batch = batch.seq,
                    rows,
                    written,
                    "Batch committed"
                );
            }
            Err(e) => match policy {
                BatchFailurePolicy::Abort => {
                    return Err(ImportError::Batch {
                        batch: batch.seq,
                        rows,
                        message: e.to_string(),
                    });
                }
                BatchFailurePolicy::Continue => {
                    warn!(
                        table = T::TABLE,
                        batch = batch.seq,
                        rows,
                        error = %e,
                        "Batch failed, continuing"
                    );
                    stats.batches_failed += 1;
                    stats.rows_failed += rows as u64;
                }
            },
        }
    }

    Ok(stats)
}

/// Buffers rows and feeds full batches to the writer task
pub struct BatchWriter<T> {
    batch_size: usize,
    buffer: Vec<T>,
    next_seq: u64,
    rows_queued: u64,
    sender: Option<mpsc::Sender<Batch<T>>>,
    handle: Option<JoinHandle<Result<WriterStats>>>,
}

impl<T: DependentRow> BatchWriter<T> {
    /// Start the writer task.
    pub fn spawn<S: ImportStore>(store: Arc<S>, config: &ImportConfig) -> Self {
        let batch_size = config.batch_size.max(1);
        let (sender, receiver) = mpsc::channel(config.max_pending_batches.max(1));
        let handle = tokio::spawn(run_writer(store, receiver, config.on_batch_failure));

        Self {
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            next_seq: 1,
            rows_queued: 0,
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Queue one row, submitting the batch once it is full.
    ///
    /// Waits while the queue is at capacity.
    pub async fn push(&mut self, row: T) -> Result<()> {
        self.buffer.push(row);
        self.rows_queued += 1;
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    pub fn rows_queued(&self) -> u64 {
        self.rows_queued
    }

    /// Batches handed to the writer so far
    pub fn batches_submitted(&self) -> u64 {
        self.next_seq - 1
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let rows = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let batch = Batch {
            seq: self.next_seq,
            rows,
        };
        self.next_seq += 1;

        let sent = match &self.sender {
            Some(sender) => sender.send(batch).await.is_ok(),
            None => false,
        };
        if sent {
            Ok(())
        } else {
            // writer is gone; its result explains why
            Err(self.writer_failure().await)
        }
    }

    /// Drop the unsubmitted partial batch and wait for the submitted ones
    /// to settle.
    pub async fn settle(mut self) -> Result<WriterStats> {
        if !self.buffer.is_empty() {
            debug!(rows = self.buffer.len(), "Partial batch dropped");
            self.rows_queued -= self.buffer.len() as u64;
            self.buffer.clear();
        }
        self.finish().await
    }

    async fn writer_failure(&mut self) -> ImportError {
        self.sender = None;
        match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(Err(e)) => e,
                Ok(Ok(_)) => ImportError::Writer("writer exited with batches pending".to_string()),
                Err(join) => ImportError::Writer(join.to_string()),
            },
            None => ImportError::Writer("writer already stopped".to_string()),
        }
    }

    /// Submit the partial batch and wait until every batch is settled.
    pub async fn finish(mut self) -> Result<WriterStats> {
        self.flush().await?;
        self.sender = None;

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|join| ImportError::Writer(join.to_string()))?,
            None => Err(ImportError::Writer("writer already stopped".to_string())),
        }
    }
}

/// Run a loading pass over `source`.
///
/// `resolve` turns a raw row into a dependent row, or returns the skip
/// reason to record.
pub async fn load<S, T, F>(
    store: Arc<S>,
    source: &CsvSource,
    config: &ImportConfig,
    ledger: &mut SkipLedger,
    progress: &RowProgress,
    mut resolve: F,
) -> Result<LoadOutcome>
where
    S: ImportStore,
    T: DependentRow,
    F: FnMut(&RawRecord) -> std::result::Result<T, String>,
{
    let mut writer = BatchWriter::<T>::spawn(store, config);
    let mut outcome = LoadOutcome::default();

    let fed = feed(source, config, ledger, progress, &mut writer, &mut outcome, &mut resolve).await;
    outcome.rows_queued = writer.rows_queued();
    let batches = writer.batches_submitted();

    // submitted batches settle even when reading failed
    let finished = match &fed {
        Ok(()) => writer.finish().await,
        Err(_) => writer.settle().await,
    };
    fed?;
    outcome.writer = finished?;

    ledger.record_many(BATCH_FAILED, outcome.writer.rows_failed);

    info!(
        table = T::TABLE,
        rows = outcome.rows_processed,
        queued = outcome.rows_queued,
        inserted = outcome.writer.rows_inserted,
        batches = batches,
        failed_batches = outcome.writer.batches_failed,
        "Loading pass finished"
    );

    Ok(outcome)
}

async fn feed<T, F>(
    source: &CsvSource,
    config: &ImportConfig,
    ledger: &mut SkipLedger,
    progress: &RowProgress,
    writer: &mut BatchWriter<T>,
    outcome: &mut LoadOutcome,
    resolve: &mut F,
) -> Result<()>
where
    T: DependentRow,
    F: FnMut(&RawRecord) -> std::result::Result<T, String>,
{
    let mut rows = source.open().await?;
    progress.start_pass(&format!("Loading {}", T::TABLE));

    while let Some(row) = rows.next().await {
        let row = row?;
        outcome.rows_processed += 1;
        progress.inc();

        match resolve(&row) {
            Ok(resolved) => writer.push(resolved).await?,
            Err(reason) => {
                debug!(line = ?row.line(), reason = %reason, "Row skipped");
                ledger.record(reason);
            }
        }

        if config.progress_interval > 0 && outcome.rows_processed % config.progress_interval == 0 {
            info!(
                rows = outcome.rows_processed,
                queued = writer.rows_queued(),
                skipped = ledger.total(),
                "Progress"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::NewHotel;
    use crate::store::MemoryStore;

    fn hotel(id: i32) -> NewHotel {
        NewHotel {
            global_property_id: id,
            source_property_id: format!("S{}", id),
            name: format!("Hotel {}", id),
            chain_code: "CC".into(),
            address_1: "1 Main St".into(),
            address_2: None,
            airport_code: "XXX".into(),
            city_id: 1,
            region_id: 1,
            zip_postal: "00000".into(),
            phone_number: "555".into(),
            fax_number: None,
            sabre_rating: 3.0,
            latitude: 1.0,
            longitude: 2.0,
            source_group_code: "G".into(),
        }
    }

    fn config(batch_size: usize, policy: BatchFailurePolicy) -> ImportConfig {
        ImportConfig::default()
            .with_batch_size(batch_size)
            .with_max_pending_batches(1)
            .with_batch_failure_policy(policy)
    }

    #[tokio::test]
    async fn test_batches_submitted_in_order_with_partial_tail() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = BatchWriter::spawn(Arc::clone(&store), &config(2, BatchFailurePolicy::Abort));
        for id in 1..=5 {
            writer.push(hotel(id)).await.unwrap();
        }
        let stats = writer.finish().await.unwrap();

        assert_eq!(store.submissions().await, vec![2, 2, 1]);
        assert_eq!(stats.batches_committed, 3);
        assert_eq!(stats.rows_inserted, 5);
    }

    #[tokio::test]
    async fn test_abort_policy_surfaces_batch_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_submission(2).await;

        let mut writer = BatchWriter::spawn(Arc::clone(&store), &config(1, BatchFailurePolicy::Abort));
        let mut pushed = Ok(());
        for id in 1..=6 {
            pushed = writer.push(hotel(id)).await;
            if pushed.is_err() {
                break;
            }
        }
        let result = match pushed {
            Err(e) => Err(e),
            Ok(()) => writer.finish().await,
        };

        assert!(matches!(result, Err(ImportError::Batch { batch: 2, rows: 1, .. })));
        assert_eq!(store.hotels().await.len(), 1);
        let (_, rollbacks) = store.transactions().await;
        assert_eq!(rollbacks, 1);
    }

    #[tokio::test]
    async fn test_continue_policy_counts_failed_rows() {
        let store = Arc::new(MemoryStore::new());
        store.fail_submission(1).await;

        let mut writer =
            BatchWriter::spawn(Arc::clone(&store), &config(3, BatchFailurePolicy::Continue));
        for id in 1..=5 {
            writer.push(hotel(id)).await.unwrap();
        }
        let stats = writer.finish().await.unwrap();

        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.rows_failed, 3);
        assert_eq!(stats.batches_committed, 1);
        assert_eq!(store.hotels().await.len(), 2);
    }

    #[tokio::test]
    async fn test_settle_drops_partial_batch() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = BatchWriter::spawn(Arc::clone(&store), &config(2, BatchFailurePolicy::Abort));
        for id in 1..=5 {
            writer.push(hotel(id)).await.unwrap();
        }
        let stats = writer.settle().await.unwrap();

        assert_eq!(store.submissions().await, vec![2, 2]);
        assert_eq!(stats.batches_committed, 2);
        assert_eq!(store.hotels().await.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicates_are_ignored_not_errors() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..2 {
            let mut writer =
                BatchWriter::spawn(Arc::clone(&store), &config(10, BatchFailurePolicy::Abort));
            writer.push(hotel(7)).await.unwrap();
            writer.push(hotel(7)).await.unwrap();
            writer.finish().await.unwrap();
        }
        assert_eq!(store.hotels().await.len(), 1);
    }
}
