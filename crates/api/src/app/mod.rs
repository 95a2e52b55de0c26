//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: engine, notifier and gateway construction
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
