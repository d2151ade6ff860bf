//! Error bodies for requests that match no handler
//!
//! Unknown paths get a `NOT_FOUND` body from the router fallback. Known paths
//! called with an unsupported method get axum's empty 405, which is rewritten
//! here into the regular error body (the `Allow` header is kept).

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Router fallback for unknown paths
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}

pub async fn method_not_allowed_body(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    // Only the router's own bodiless 405 is replaced
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut replaced = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        replaced.headers_mut().insert(header::ALLOW, allow);
    }
    replaced
}
