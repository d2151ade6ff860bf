//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Processing lifecycle status
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Processed,
    Failed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 3] = [
        RecordStatus::Pending,
        RecordStatus::Processed,
        RecordStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Processed => "processed",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordStatus::Pending)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "processed" => Ok(RecordStatus::Processed),
            "failed" => Ok(RecordStatus::Failed),
            other => Err(Error::InvalidFilter(format!(
                "status must be one of pending, processed, failed; got '{}'",
                other
            ))),
        }
    }
}

/// Three-tier score classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    High,
    Medium,
    Low,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::High => "high",
            Classification::Medium => "medium",
            Classification::Low => "low",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Classification::High),
            "medium" => Ok(Classification::Medium),
            "low" => Ok(Classification::Low),
            other => Err(Error::Internal(format!("Unknown classification '{}'", other))),
        }
    }
}

/// A unit of intake data tracked through the processing lifecycle
///
/// While `status` is pending, `result`, `classification`, `score` and `error`
/// are all `None`. Once terminal, either `classification` + `score` or `error`
/// is populated, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub source: String,
    pub category: String,
    pub payload: Map<String, Value>,
    pub result: Option<Value>,
    pub classification: Option<Classification>,
    pub score: Option<f64>,
    pub error: Option<String>,
}

/// Validated input for record creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub source: String,
    pub category: String,
    pub payload: Map<String, Value>,
}
