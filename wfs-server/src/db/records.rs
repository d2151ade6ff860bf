//! Record table operations

use serde_json::{json, Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use wfs_common::db::{Classification, NewRecord, Record, RecordStatus};
use wfs_common::{time, uuid_utils, Error, Result};

use crate::pagination::Pagination;
use crate::reporting::{RecordFilter, Sort, SortField};

const RECORD_COLUMNS: &str =
    "id, created_at, status, source, category, payload, result, classification, score, error";

/// Terminal state written by the processing state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Processed {
        score: f64,
        classification: Classification,
    },
    Failed {
        error: String,
    },
}

impl Transition {
    pub fn status(&self) -> RecordStatus {
        match self {
            Transition::Processed { .. } => RecordStatus::Processed,
            Transition::Failed { .. } => RecordStatus::Failed,
        }
    }

    /// Structured outcome stored in the `result` column
    pub fn result(&self) -> Value {
        match self {
            Transition::Processed {
                score,
                classification,
            } => json!({ "score": score, "classification": classification }),
            Transition::Failed { error } => json!({ "error": error }),
        }
    }
}

/// Insert a new pending record and return its snapshot
pub async fn insert_record(pool: &SqlitePool, new: NewRecord) -> Result<Record> {
    let record = Record {
        id: uuid_utils::generate_id(),
        created_at: time::now(),
        status: RecordStatus::Pending,
        source: new.source,
        category: new.category,
        payload: new.payload,
        result: None,
        classification: None,
        score: None,
        error: None,
    };

    let payload = serde_json::to_string(&record.payload)
        .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO records (id, created_at, status, source, category, payload)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(time::to_storage(&record.created_at))
    .bind(record.status.as_str())
    .bind(&record.source)
    .bind(&record.category)
    .bind(&payload)
    .execute(pool)
    .await?;

    Ok(record)
}

/// Load a record by id
pub async fn fetch_record(pool: &SqlitePool, id: &str) -> Result<Option<Record>> {
    let row = sqlx::query(&format!("SELECT {} FROM records WHERE id = ?", RECORD_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Apply a terminal transition if and only if the record is still pending
///
/// The status check and the write are one UPDATE statement, so concurrent
/// callers cannot both succeed. Returns `false` when no pending row matched.
pub async fn complete_record(pool: &SqlitePool, id: &str, transition: &Transition) -> Result<bool> {
    let (classification, score, error) = match transition {
        Transition::Processed {
            score,
            classification,
        } => (Some(classification.as_str()), Some(*score), None),
        Transition::Failed { error } => (None, None, Some(error.as_str())),
    };

    let result = serde_json::to_string(&transition.result())
        .map_err(|e| Error::Internal(format!("Failed to serialize result: {}", e)))?;

    let outcome = sqlx::query(
        r#"
        UPDATE records
        SET status = ?, result = ?, classification = ?, score = ?, error = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(transition.status().as_str())
    .bind(&result)
    .bind(classification)
    .bind(score)
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(outcome.rows_affected() == 1)
}

/// One page of matching records plus the total match count
///
/// Both reads share a transaction so `total` and `items` describe the same snapshot.
pub async fn list_records(
    pool: &SqlitePool,
    filter: &RecordFilter,
    page: Pagination,
    sort: Sort,
) -> Result<(Vec<Record>, i64)> {
    let mut tx = pool.begin().await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM records");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM records", RECORD_COLUMNS));
    push_filters(&mut select, filter);
    push_order(&mut select, sort);
    select
        .push(" LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
    let rows = select.build().fetch_all(&mut *tx).await?;

    tx.commit().await?;

    let items = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

/// Matching record counts grouped by status and by category
///
/// Categories are ordered by name. Both aggregates share a transaction.
pub async fn count_records(
    pool: &SqlitePool,
    filter: &RecordFilter,
) -> Result<(Vec<(RecordStatus, i64)>, Vec<(String, i64)>)> {
    let mut tx = pool.begin().await?;

    let mut by_status = QueryBuilder::<Sqlite>::new("SELECT status, COUNT(*) FROM records");
    push_filters(&mut by_status, filter);
    by_status.push(" GROUP BY status");
    let status_rows: Vec<(String, i64)> = by_status.build_query_as().fetch_all(&mut *tx).await?;

    let mut by_category = QueryBuilder::<Sqlite>::new("SELECT category, COUNT(*) FROM records");
    push_filters(&mut by_category, filter);
    by_category.push(" GROUP BY category ORDER BY category ASC");
    let category_rows: Vec<(String, i64)> =
        by_category.build_query_as().fetch_all(&mut *tx).await?;

    tx.commit().await?;

    let statuses = status_rows
        .into_iter()
        .map(|(status, count)| stored_status(&status).map(|status| (status, count)))
        .collect::<Result<Vec<_>>>()?;

    Ok((statuses, category_rows))
}

/// Append the conjunctive WHERE clause for a filter set
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter) {
    let mut separator = " WHERE ";

    if let Some(status) = filter.status {
        qb.push(separator).push("status = ").push_bind(status.as_str());
        separator = " AND ";
    }
    if let Some(category) = &filter.category {
        qb.push(separator).push("category = ").push_bind(category.clone());
        separator = " AND ";
    }
    if let Some(after) = &filter.created_after {
        qb.push(separator)
            .push("created_at >= ")
            .push_bind(time::to_storage(&time::ceil_to_storage(after)));
        separator = " AND ";
    }
    if let Some(before) = &filter.created_before {
        // Truncation is exact for an upper bound
        qb.push(separator)
            .push("created_at <= ")
            .push_bind(time::to_storage(before));
    }
}

/// ORDER BY with deterministic tie-breaks (newest first, then id)
fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, sort: Sort) {
    qb.push(" ORDER BY ")
        .push(sort.field.column())
        .push(" ")
        .push(sort.order.keyword());

    if sort.field != SortField::CreatedAt {
        qb.push(", created_at DESC");
    }
    qb.push(", id ASC");
}

fn stored_status(value: &str) -> Result<RecordStatus> {
    value
        .parse()
        .map_err(|_| Error::Internal(format!("Corrupt stored status '{}'", value)))
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let created_at: String = row.try_get("created_at")?;
    let status: String = row.try_get("status")?;

    let payload: String = row.try_get("payload")?;
    let payload: Map<String, Value> = serde_json::from_str(&payload)
        .map_err(|e| Error::Internal(format!("Corrupt stored payload: {}", e)))?;

    let result: Option<String> = row.try_get("result")?;
    let result = result
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()
        .map_err(|e| Error::Internal(format!("Corrupt stored result: {}", e)))?;

    let classification: Option<String> = row.try_get("classification")?;
    let classification = classification
        .map(|raw| raw.parse::<Classification>())
        .transpose()?;

    Ok(Record {
        id: row.try_get("id")?,
        created_at: time::from_storage(&created_at)?,
        status: stored_status(&status)?,
        source: row.try_get("source")?,
        category: row.try_get("category")?,
        payload,
        result,
        classification,
        score: row.try_get("score")?,
        error: row.try_get("error")?,
    })
}
