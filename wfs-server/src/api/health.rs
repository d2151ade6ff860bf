//! Health and version endpoints (public)

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

pub const MODULE_NAME: &str = "wfs-server";

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

/// GET /health
///
/// 500 when the database probe fails.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match wfs_common::db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            DatabaseHealth {
                status: "ok",
                error: None,
            },
        ),
        Err(e) => {
            warn!(error = %e, "Health check database probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                DatabaseHealth {
                    status: "error",
                    error: Some(e.to_string()),
                },
            )
        }
    };

    (
        status,
        Json(HealthResponse {
            status: if status.is_success() { "ok" } else { "error" },
            module: MODULE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub environment: String,
}

/// GET /version
pub async fn get_version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_HASH"),
        environment: state.config.environment.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(get_version))
}
