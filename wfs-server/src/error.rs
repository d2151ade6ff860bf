//! HTTP error mapping
//!
//! Every failed request produces the same body:
//! `{"error": {"code", "message", "details"?}, "request_id"}`

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::api::request_id;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Record does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record is no longer pending (409)
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    /// Malformed request body (422)
    #[error("Invalid request body: {message}")]
    InvalidBody {
        message: String,
        details: Option<Value>,
    },

    /// Malformed query string or filter value (400)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Known route, unsupported method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Missing or wrong API key (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Anything unexpected (500); the cause is logged, never returned
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            // No such operation on this route
            ApiError::NotFound(_) | ApiError::MethodNotAllowed => "NOT_FOUND",
            ApiError::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            ApiError::InvalidBody { .. } | ApiError::InvalidQuery(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::AlreadyProcessed(_) => StatusCode::CONFLICT,
            ApiError::InvalidBody { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<wfs_common::Error> for ApiError {
    fn from(err: wfs_common::Error) -> Self {
        use wfs_common::Error;

        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::AlreadyProcessed(msg),
            Error::Validation { message, details } => ApiError::InvalidBody { message, details },
            Error::InvalidFilter(msg) => ApiError::InvalidQuery(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            other @ (Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_)) => {
                let request_id = request_id::current().unwrap_or_default();
                error!(request_id = %request_id, error = %other, "Request failed");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            message: rejection.body_text(),
            details: None,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut error = json!({
            "code": self.code(),
            "message": match &self {
                ApiError::NotFound(msg)
                | ApiError::AlreadyProcessed(msg)
                | ApiError::InvalidQuery(msg)
                | ApiError::Unauthorized(msg) => msg.clone(),
                ApiError::InvalidBody { message, .. } => message.clone(),
                ApiError::MethodNotAllowed => "method not allowed".to_string(),
                ApiError::Internal => "internal server error".to_string(),
            },
        });
        if let ApiError::InvalidBody {
            details: Some(details),
            ..
        } = &self
        {
            error["details"] = details.clone();
        }

        let body = Json(json!({
            "error": error,
            "request_id": request_id::current(),
        }));

        let mut response = (status, body).into_response();
        if matches!(self, ApiError::Unauthorized(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("ApiKey"));
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
