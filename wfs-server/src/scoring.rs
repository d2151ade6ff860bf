//! Scoring Engine
//!
//! Pure mapping from a record payload to a numeric score and a three-tier
//! classification. No I/O; identical payloads always score identically.
//!
//! # Signals
//! | Field      | Weight |
//! |------------|--------|
//! | `priority` | 1.0    |
//! | `impact`   | 1.0    |
//! | `urgency`  | 1.0    |
//!
//! An absent or `null` signal contributes 0. A present signal must be a JSON
//! number or a numeric string; anything else is an invalid payload. So is a
//! set of finite signals whose weighted sum overflows.
//!
//! # Classification
//! - High: score ≥ 12
//! - Medium: score ≥ 6
//! - Low: otherwise

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use wfs_common::db::Classification;

/// Named signals and their fixed weights
pub const SIGNALS: [(&str, f64); 3] = [("priority", 1.0), ("impact", 1.0), ("urgency", 1.0)];

/// Minimum score classified as high
pub const HIGH_THRESHOLD: f64 = 12.0;

/// Minimum score classified as medium
pub const MEDIUM_THRESHOLD: f64 = 6.0;

/// Scoring failure; recorded as a failed record, never surfaced as a request error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid payload: field '{field}' is not numeric: {value}")]
    InvalidPayload { field: &'static str, value: String },

    #[error("invalid payload: signals sum to a non-finite score")]
    ScoreOverflow,
}

/// Successful scoring outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub score: f64,
    pub classification: Classification,
}

/// Compute the weighted score and classification for a payload
pub fn compute(payload: &Map<String, Value>) -> Result<Score, ScoringError> {
    let mut score = 0.0;
    for (field, weight) in SIGNALS {
        score += weight * signal(payload, field)?;
    }

    // A stored score must serialize as a number
    if !score.is_finite() {
        return Err(ScoringError::ScoreOverflow);
    }

    Ok(Score {
        score,
        classification: classify(score),
    })
}

/// Map a score to its tier
pub fn classify(score: f64) -> Classification {
    if score >= HIGH_THRESHOLD {
        Classification::High
    } else if score >= MEDIUM_THRESHOLD {
        Classification::Medium
    } else {
        Classification::Low
    }
}

fn signal(payload: &Map<String, Value>, field: &'static str) -> Result<f64, ScoringError> {
    let value = match payload.get(field) {
        None | Some(Value::Null) => return Ok(0.0),
        Some(value) => value,
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    // "NaN" and "inf" parse as f64 but cannot be ranked
    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ScoringError::InvalidPayload {
            field,
            value: value.to_string(),
        }),
    }
}
