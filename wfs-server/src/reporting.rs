//! Query/Reporting Engine
//!
//! Filtered, paginated, sortable listing and aggregate summaries. Both run
//! the same filter set against the Record Store, so a summary always agrees
//! with the listing for identical filters. Every input is validated before
//! any query runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::debug;
use wfs_common::db::{Record, RecordStatus};
use wfs_common::{time, Error, Result};

use crate::db::records;
use crate::pagination::{calculate_pagination, Pagination};

/// Raw, unvalidated filter values as supplied by the caller
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
}

/// Validated conjunctive filter set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub status: Option<RecordStatus>,
    pub category: Option<String>,
    /// Inclusive lower bound on `created_at`
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub created_before: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn from_params(params: &FilterParams) -> Result<Self> {
        let status = non_empty(&params.status)
            .map(RecordStatus::from_str)
            .transpose()?;

        let created_after = non_empty(&params.created_after)
            .map(|v| time::parse_filter_timestamp("created_after", v))
            .transpose()?;
        let created_before = non_empty(&params.created_before)
            .map(|v| time::parse_filter_timestamp("created_before", v))
            .transpose()?;

        if let (Some(after), Some(before)) = (created_after, created_before) {
            if after > before {
                return Err(Error::InvalidFilter(
                    "created_after must not be later than created_before".to_string(),
                ));
            }
        }

        Ok(Self {
            status,
            category: non_empty(&params.category).map(str::to_string),
            created_after,
            created_before,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Sortable columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    Status,
    Category,
    Source,
}

impl SortField {
    /// Column name; only these fixed identifiers ever reach SQL text
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Status => "status",
            SortField::Category => "category",
            SortField::Source => "source",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created_at" => Ok(SortField::CreatedAt),
            "status" => Ok(SortField::Status),
            "category" => Ok(SortField::Category),
            "source" => Ok(SortField::Source),
            other => Err(Error::InvalidFilter(format!(
                "sort_by must be one of created_at, status, category, source; got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidFilter(format!(
                "sort_order must be asc or desc; got '{}'",
                other
            ))),
        }
    }
}

/// Column and direction; defaults to newest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Result<Self> {
        let field = sort_by
            .filter(|v| !v.is_empty())
            .map(str::parse::<SortField>)
            .transpose()?
            .unwrap_or_default();
        let order = sort_order
            .filter(|v| !v.is_empty())
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self { field, order })
    }
}

/// Listing request: filters, pagination and sort, all unvalidated
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub filters: FilterParams,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// One page of records
#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub items: Vec<Record>,
    /// Items on this page
    pub count: usize,
    /// All matching records before pagination
    pub total: i64,
    /// Effective (capped) page size
    pub limit: i64,
    pub offset: i64,
}

/// List records matching the filters
pub async fn list(pool: &SqlitePool, request: &ListRequest) -> Result<RecordPage> {
    let filter = RecordFilter::from_params(&request.filters)?;
    let page: Pagination = calculate_pagination(request.limit, request.offset)?;
    let sort = Sort::parse(request.sort_by.as_deref(), request.sort_order.as_deref())?;

    debug!(?filter, ?page, ?sort, "Listing records");

    let (items, total) = records::list_records(pool, &filter, page, sort).await?;

    Ok(RecordPage {
        count: items.len(),
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Counts by status; every status is present, defaulting to 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub all: i64,
    pub pending: i64,
    pub processed: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Aggregate view of the records matching a filter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub totals: StatusTotals,
    pub by_category: Vec<CategoryCount>,
}

/// Summarize records matching the filters
///
/// `totals.all` is the sum of the per-status counts, which equals the
/// listing `total` for the same filters.
pub async fn summarize(pool: &SqlitePool, params: &FilterParams) -> Result<Summary> {
    let filter = RecordFilter::from_params(params)?;

    let (by_status, by_category) = records::count_records(pool, &filter).await?;

    let mut totals = StatusTotals::default();
    for (status, count) in by_status {
        match status {
            RecordStatus::Pending => totals.pending = count,
            RecordStatus::Processed => totals.processed = count,
            RecordStatus::Failed => totals.failed = count,
        }
    }
    totals.all = totals.pending + totals.processed + totals.failed;

    Ok(Summary {
        totals,
        by_category: by_category
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
    })
}
