//! Pagination utilities for record listings
//!
//! `limit` defaults to 50 and is silently capped at 200; `offset` defaults to 0.

use wfs_common::{Error, Result};

/// Page size when the caller does not ask for one
pub const DEFAULT_LIMIT: i64 = 50;

/// Hard ceiling on page size
pub const MAX_LIMIT: i64 = 200;

/// Validated LIMIT/OFFSET pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Effective page size, 1..=MAX_LIMIT
    pub limit: i64,
    /// Number of matching rows to skip
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Calculate pagination from the requested limit and offset
///
/// # Examples
/// ```
/// use wfs_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(None, None).unwrap();
/// assert_eq!((p.limit, p.offset), (50, 0));
///
/// // Oversized pages are capped, not rejected
/// let p = calculate_pagination(Some(500), Some(20)).unwrap();
/// assert_eq!((p.limit, p.offset), (200, 20));
///
/// assert!(calculate_pagination(Some(0), None).is_err());
/// ```
pub fn calculate_pagination(limit: Option<i64>, offset: Option<i64>) -> Result<Pagination> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(Error::InvalidFilter(format!(
            "limit must be at least 1, got {}",
            limit
        )));
    }

    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(Error::InvalidFilter(format!(
            "offset must not be negative, got {}",
            offset
        )));
    }

    Ok(Pagination {
        limit: limit.min(MAX_LIMIT),
        offset,
    })
}
