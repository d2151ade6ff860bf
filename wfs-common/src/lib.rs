//! # Workflow Service Common Library
//!
//! Shared code for the workflow service including:
//! - Error taxonomy
//! - Record model and status/classification enums
//! - Database initialization and lock-retry helper
//! - Configuration resolution
//! - Timestamp and id utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
