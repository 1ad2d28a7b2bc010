//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection and service composition
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and body parsing helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware::{self, SecretGate};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Backends, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let cron_gate = SecretGate::optional(services.cron_secret.as_deref());
    let admin_gate = SecretGate::required(services.admin_secret.as_deref());

    let cron = routes::cron::router().layer(axum::middleware::from_fn_with_state(
        cron_gate,
        middleware::require_secret,
    ));
    let admin = routes::admin::router().layer(axum::middleware::from_fn_with_state(
        admin_gate,
        middleware::require_secret,
    ));

    let api = routes::router()
        .nest("/cron", cron)
        .nest("/admin", admin);

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::trace_requests))
                .layer(Extension(services)),
        )
}
