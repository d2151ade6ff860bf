//! Processing State Machine
//!
//! Moves a record from `pending` to exactly one terminal state:
//! `processed` when the payload scores, `failed` when it does not.
//!
//! At-most-once: the terminal write is conditioned on the row still being
//! pending, so of any number of concurrent calls for one record exactly one
//! commits and the rest observe `Conflict`. Terminal records are never
//! rescored.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use wfs_common::db::{Record, RecordStatus};
use wfs_common::{Error, Result};

use crate::db::records::{self, Transition};
use crate::scoring;

/// Process a record by id and return its terminal snapshot
///
/// # Errors
/// - `NotFound` when no record has this id
/// - `Conflict` when the record is already terminal, including when a
///   concurrent call committed first
/// - `Database` when the read or the conditional write fails; the record is
///   left pending and the call may be retried
///
/// A payload that cannot be scored is not an error here: the record is
/// committed as `failed` and returned.
pub async fn process(pool: &SqlitePool, id: &str) -> Result<Record> {
    let record = records::fetch_record(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound("record not found".to_string()))?;

    if record.status != RecordStatus::Pending {
        debug!(record_id = %id, status = %record.status, "Process rejected: record already terminal");
        return Err(Error::Conflict("record is not pending".to_string()));
    }

    let transition = evaluate(&record);

    if !records::complete_record(pool, id, &transition).await? {
        warn!(record_id = %id, "Process rejected: concurrent transition committed first");
        return Err(Error::Conflict("record is not pending".to_string()));
    }

    match &transition {
        Transition::Processed {
            score,
            classification,
        } => info!(record_id = %id, score, %classification, "Record processed"),
        Transition::Failed { error } => info!(record_id = %id, %error, "Record failed scoring"),
    }

    Ok(apply(record, transition))
}

/// Score the payload and choose the terminal state
fn evaluate(record: &Record) -> Transition {
    match scoring::compute(&record.payload) {
        Ok(result) => Transition::Processed {
            score: result.score,
            classification: result.classification,
        },
        Err(e) => Transition::Failed {
            error: e.to_string(),
        },
    }
}

/// The snapshot the committed write produced
fn apply(mut record: Record, transition: Transition) -> Record {
    record.status = transition.status();
    record.result = Some(transition.result());
    match transition {
        Transition::Processed {
            score,
            classification,
        } => {
            record.score = Some(score);
            record.classification = Some(classification);
        }
        Transition::Failed { error } => {
            record.error = Some(error);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::task::JoinSet;
    use wfs_common::db::{init_database, Classification, NewRecord};

    async fn setup() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("processing.db")).await.unwrap();
        (dir, pool)
    }

    async fn create(pool: &SqlitePool, payload: Value) -> Record {
        records::insert_record(
            pool,
            NewRecord {
                source: "t".to_string(),
                category: "alpha".to_string(),
                payload: payload.as_object().cloned().unwrap(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_process_scores_and_persists() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": 3})).await;

        let processed = process(&pool, &record.id).await.unwrap();

        assert_eq!(processed.status, RecordStatus::Processed);
        assert_eq!(processed.score, Some(3.0));
        assert_eq!(processed.classification, Some(Classification::Low));
        assert_eq!(processed.error, None);
        assert_eq!(
            processed.result,
            Some(json!({"score": 3.0, "classification": "low"}))
        );

        // Returned snapshot matches what was committed
        let stored = records::fetch_record(&pool, &record.id).await.unwrap().unwrap();
        assert_eq!(stored, processed);
    }

    #[tokio::test]
    async fn test_unscorable_payload_becomes_failed_record() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": "xxx"})).await;

        let failed = process(&pool, &record.id).await.unwrap();

        assert_eq!(failed.status, RecordStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("priority"));
        assert_eq!(failed.score, None);
        assert_eq!(failed.classification, None);
        assert_eq!(
            failed.result,
            Some(json!({"error": failed.error.clone().unwrap()}))
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_dir, pool) = setup().await;
        assert!(matches!(
            process(&pool, "missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_second_call_conflicts_without_changes() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": 8})).await;

        let first = process(&pool, &record.id).await.unwrap();
        let second = process(&pool, &record.id).await;

        assert!(matches!(second, Err(Error::Conflict(_))));
        let stored = records::fetch_record(&pool, &record.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_failed_records_are_terminal() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"impact": [1, 2]})).await;

        process(&pool, &record.id).await.unwrap();
        assert!(matches!(
            process(&pool, &record.id).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_record_pending() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": 4})).await;

        sqlx::query(
            "CREATE TRIGGER reject_updates BEFORE UPDATE ON records \
             BEGIN SELECT RAISE(ABORT, 'updates rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = process(&pool, &record.id).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)), "unexpected error: {err:?}");
        assert!(err.is_retryable());

        let stored = records::fetch_record(&pool, &record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Pending);
        assert_eq!(stored.result, None);
        assert_eq!(stored.score, None);
        assert_eq!(stored.classification, None);
        assert_eq!(stored.error, None);

        // Once writes work again the same record can still be processed
        sqlx::query("DROP TRIGGER reject_updates")
            .execute(&pool)
            .await
            .unwrap();
        let processed = process(&pool, &record.id).await.unwrap();
        assert_eq!(processed.status, RecordStatus::Processed);
    }

    #[tokio::test]
    async fn test_overflowing_signals_fail_the_record() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": 1e308, "impact": 1e308})).await;

        let failed = process(&pool, &record.id).await.unwrap();

        assert_eq!(failed.status, RecordStatus::Failed);
        assert_eq!(failed.score, None);
        assert_eq!(failed.classification, None);
        assert!(failed.error.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_process_exactly_one_wins() {
        let (_dir, pool) = setup().await;
        let record = create(&pool, json!({"priority": 5, "impact": 5})).await;

        let mut join_set = JoinSet::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let id = record.id.clone();
            join_set.spawn(async move { process(&pool, &id).await });
        }

        let mut successes = 0;
        let mut conflicts = 0;
        while let Some(result) = join_set.join_next().await {
            match result.expect("Task panicked") {
                Ok(r) => {
                    successes += 1;
                    assert_eq!(r.classification, Some(Classification::Medium));
                }
                Err(Error::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }
}
