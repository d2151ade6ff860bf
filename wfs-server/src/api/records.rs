//! Record endpoints
//!
//! - `POST /records` create (201)
//! - `GET /records/:id` point lookup
//! - `POST /records/:id/process` run the processing state machine
//! - `GET /records` filtered, paginated listing

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use wfs_common::db::{NewRecord, Record};
use wfs_common::Error;

use crate::db::records;
use crate::error::{ApiError, ApiResult};
use crate::processing;
use crate::reporting::{self, FilterParams, ListRequest, RecordPage};
use crate::AppState;

/// Maximum length of `source` and `category` after trimming
pub const MAX_TAG_LEN: usize = 100;

/// POST /records
///
/// Body: `{"source": str, "category": str, "payload": object}`. A missing
/// payload is stored as an empty object.
pub async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let Json(body) = body?;
    let new_record = validate_new_record(&body)?;

    let record = records::insert_record(&state.db, new_record).await?;
    info!(record_id = %record.id, category = %record.category, "Record created");

    if let Some(queue) = &state.queue {
        queue.enqueue(&record.id);
    }

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /records/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    records::fetch_record(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("record not found".to_string()))
}

/// POST /records/:id/process
pub async fn process_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Record>> {
    let record = processing::process(&state.db, &id).await?;
    Ok(Json(record))
}

/// Query parameters for GET /records
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<ListQuery> for ListRequest {
    fn from(query: ListQuery) -> Self {
        ListRequest {
            filters: FilterParams {
                status: query.status,
                category: query.category,
                created_after: query.created_after,
                created_before: query.created_before,
            },
            limit: query.limit,
            offset: query.offset,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
        }
    }
}

/// GET /records
pub async fn list_records(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<RecordPage>> {
    let Query(query) = query?;
    let page = reporting::list(&state.db, &query.into()).await?;
    Ok(Json(page))
}

/// Check a create body, collecting every field problem before failing
fn validate_new_record(body: &Value) -> Result<NewRecord, Error> {
    let Some(body) = body.as_object() else {
        return Err(Error::validation("request body must be a JSON object"));
    };

    let mut errors = Vec::new();
    let source = required_tag(body, "source", &mut errors);
    let category = required_tag(body, "category", &mut errors);

    let payload = match body.get("payload") {
        None | Some(Value::Null) => Some(Map::new()),
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            errors.push(field_error("payload", "must be a JSON object"));
            None
        }
    };

    match (source, category, payload) {
        (Some(source), Some(category), Some(payload)) if errors.is_empty() => Ok(NewRecord {
            source,
            category,
            payload,
        }),
        _ => Err(Error::Validation {
            message: "invalid record".to_string(),
            details: Some(json!({ "errors": errors })),
        }),
    }
}

fn required_tag(body: &Map<String, Value>, field: &str, errors: &mut Vec<Value>) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                errors.push(field_error(field, "must not be blank"));
                None
            } else if trimmed.chars().count() > MAX_TAG_LEN {
                errors.push(field_error(
                    field,
                    &format!("must be at most {} characters", MAX_TAG_LEN),
                ));
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None | Some(Value::Null) => {
            errors.push(field_error(field, "is required"));
            None
        }
        Some(_) => {
            errors.push(field_error(field, "must be a string"));
            None
        }
    }
}

fn field_error(field: &str, message: &str) -> Value {
    json!({ "field": field, "message": message })
}
