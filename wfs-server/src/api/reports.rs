//! GET /reports/summary

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::reporting::{self, CategoryCount, FilterParams, StatusTotals};
use crate::AppState;

/// Summary filters; `date_from`/`date_to` are accepted as aliases
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl From<SummaryQuery> for FilterParams {
    fn from(query: SummaryQuery) -> Self {
        // The canonical name wins when both are given
        FilterParams {
            status: query.status,
            category: query.category,
            created_after: query.created_after.or(query.date_from),
            created_before: query.created_before.or(query.date_to),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub generated_at: DateTime<Utc>,
    /// Filters as applied, after alias resolution
    pub filters: FilterParams,
    pub totals: StatusTotals,
    pub by_category: Vec<CategoryCount>,
}

pub async fn get_summary(
    State(state): State<AppState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> ApiResult<Json<SummaryResponse>> {
    let Query(query) = query?;
    let filters: FilterParams = query.into();

    let summary = reporting::summarize(&state.db, &filters).await?;

    Ok(Json(SummaryResponse {
        generated_at: wfs_common::time::now(),
        filters,
        totals: summary.totals,
        by_category: summary.by_category,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_fill_canonical_names() {
        let filters: FilterParams = SummaryQuery {
            date_from: Some("2026-01-01".into()),
            date_to: Some("2026-01-31".into()),
            ..Default::default()
        }
        .into();

        assert_eq!(filters.created_after.as_deref(), Some("2026-01-01"));
        assert_eq!(filters.created_before.as_deref(), Some("2026-01-31"));
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let filters: FilterParams = SummaryQuery {
            created_after: Some("2026-02-01".into()),
            date_from: Some("2026-01-01".into()),
            ..Default::default()
        }
        .into();

        assert_eq!(filters.created_after.as_deref(), Some("2026-02-01"));
    }
}
