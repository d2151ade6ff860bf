//! HTTP API handlers

pub mod auth;
pub mod fallback;
pub mod health;
pub mod records;
pub mod reports;
pub mod request_id;

pub use auth::require_api_key;
pub use fallback::{method_not_allowed_body, route_not_found};
pub use health::health_routes;
pub use records::{create_record, get_record, list_records, process_record};
pub use reports::get_summary;
pub use request_id::request_id_middleware;
