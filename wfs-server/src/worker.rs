//! Background processing queue
//!
//! A bounded channel feeding a single worker task that owns the retry policy.
//! Used when `auto_process` is enabled; manual `process` calls still work and
//! race safely with the worker (one commits, the other sees `Conflict`).

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wfs_common::db::retry_on_lock;
use wfs_common::Error;

use crate::processing;

/// Queue depth before new ids are dropped
pub const QUEUE_CAPACITY: usize = 1024;

/// Total time spent retrying a locked database before giving up on an id
pub const MAX_LOCK_WAIT_MS: u64 = 5000;

/// Sending half of the processing queue
#[derive(Clone, Debug)]
pub struct ProcessingQueue {
    tx: mpsc::Sender<String>,
}

impl ProcessingQueue {
    /// Enqueue a record id; returns `false` if the queue is full or closed
    ///
    /// A record that is not enqueued stays pending and can be processed manually.
    pub fn enqueue(&self, record_id: &str) -> bool {
        match self.tx.try_send(record_id.to_string()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(id)) => {
                warn!(record_id = %id, "Processing queue full, record left pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(id)) => {
                warn!(record_id = %id, "Processing worker stopped, record left pending");
                false
            }
        }
    }
}

/// Start the worker task; it exits once every queue handle is dropped
pub fn spawn_worker(pool: SqlitePool, capacity: usize) -> (ProcessingQueue, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(run(pool, rx));
    (ProcessingQueue { tx }, handle)
}

async fn run(pool: SqlitePool, mut rx: mpsc::Receiver<String>) {
    info!("Processing worker started");

    while let Some(record_id) = rx.recv().await {
        let result = retry_on_lock("process_record", MAX_LOCK_WAIT_MS, || {
            processing::process(&pool, &record_id)
        })
        .await;

        match result {
            Ok(record) => {
                debug!(record_id = %record_id, status = %record.status, "Background processing complete");
            }
            // Someone else already handled it, or it vanished
            Err(Error::Conflict(_)) | Err(Error::NotFound(_)) => {
                debug!(record_id = %record_id, "Background processing skipped");
            }
            Err(e) => {
                error!(
                    record_id = %record_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Background processing failed, record left pending"
                );
            }
        }
    }

    info!("Processing worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wfs_common::db::{init_database, NewRecord, Record, RecordStatus};

    async fn wait_for_terminal(pool: &SqlitePool, id: &str) -> Record {
        for _ in 0..100 {
            let record = records::fetch_record(pool, id).await.unwrap().unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("record {} was not processed in time", id);
    }

    #[tokio::test]
    async fn test_worker_processes_enqueued_records() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("worker.db")).await.unwrap();
        let (queue, _handle) = spawn_worker(pool.clone(), 16);

        let record = records::insert_record(
            &pool,
            NewRecord {
                source: "t".to_string(),
                category: "alpha".to_string(),
                payload: json!({"priority": 13}).as_object().cloned().unwrap(),
            },
        )
        .await
        .unwrap();

        assert!(queue.enqueue(&record.id));
        let processed = wait_for_terminal(&pool, &record.id).await;
        assert_eq!(processed.status, RecordStatus::Processed);
        assert_eq!(processed.score, Some(13.0));
    }

    #[tokio::test]
    async fn test_worker_skips_unknown_ids_and_keeps_running() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("worker.db")).await.unwrap();
        let (queue, _handle) = spawn_worker(pool.clone(), 16);

        assert!(queue.enqueue("missing"));

        let record = records::insert_record(
            &pool,
            NewRecord {
                source: "t".to_string(),
                category: "alpha".to_string(),
                payload: json!({"urgency": "oops"}).as_object().cloned().unwrap(),
            },
        )
        .await
        .unwrap();
        assert!(queue.enqueue(&record.id));

        let failed = wait_for_terminal(&pool, &record.id).await;
        assert_eq!(failed.status, RecordStatus::Failed);
    }

    #[tokio::test]
    async fn test_worker_stops_when_queue_dropped() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("worker.db")).await.unwrap();
        let (queue, handle) = spawn_worker(pool, 1);

        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker should exit")
            .unwrap();
    }
}
