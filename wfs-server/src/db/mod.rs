//! Record Store access layer
//!
//! Point lookup by id, filtered range scan, and single-row conditional update.
//! No caching sits in front of these queries.

pub mod records;
