//! wfs-server library - record intake, scoring and reporting service
//!
//! Records are created `pending`, processed exactly once into `processed` or
//! `failed`, and queried through filtered listings and summaries.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use wfs_common::config::ServiceConfig;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod processing;
pub mod reporting;
pub mod scoring;
pub mod worker;

use worker::ProcessingQueue;

/// Application state shared across HTTP handlers
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
    /// Present when background processing is enabled
    pub queue: Option<ProcessingQueue>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig, queue: Option<ProcessingQueue>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            queue,
        }
    }
}

/// Build application router
///
/// Writes go through the API key check; reads, health and version are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let auth = middleware::from_fn_with_state(state.clone(), api::require_api_key);

    Router::new()
        .route(
            "/records",
            post(api::create_record)
                .route_layer(auth.clone())
                .get(api::list_records),
        )
        .route("/records/:id", get(api::get_record))
        .route(
            "/records/:id/process",
            post(api::process_record).route_layer(auth),
        )
        .route("/reports/summary", get(api::get_summary))
        .merge(api::health_routes())
        .fallback(api::route_not_found)
        .with_state(state)
        .layer(middleware::from_fn(api::method_not_allowed_body))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(api::request_id_middleware))
}
